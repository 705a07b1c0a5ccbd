//! E2E tests for the BIFF8 model: build record streams, read them into the
//! workbook and sheet models, mutate, and write them back.

mod common;
mod container;
mod drawing;
mod link_table;
mod ordering;
mod roundtrip;
mod scenarios;

// Re-export common utilities for use in submodules
pub use common::*;
