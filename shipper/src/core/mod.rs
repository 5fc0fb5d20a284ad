//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod checkpoint;
pub mod closure;
pub mod directive;
pub mod naming;
pub mod plan;
pub mod types;
