//! Shared utilities for docvault integration tests.
//!
//! - `TestHarness`: a wired `Docvault` over a temp storage directory and an
//!   in-memory database
//! - `ScriptedGenerator`: a `Generator` double that records prompts and can
//!   be told to fail or stall
//! - builders for PDF and Word fixtures

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedGenerator, TestHarness};
