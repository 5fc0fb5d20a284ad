//! Issue-to-implementation pipeline: provision a git workspace, run a
//! code-writing agent against it, and ship the result.
//!
//! The crate splits along one seam throughout:
//!
//! - **[`core`]**: Pure decision logic (workspace planning, the checkpoint
//!   protocol, closure analysis). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (git, the issue tracker, the
//!   agent process, on-disk state). Each sits behind a narrow seam so tests
//!   can script it.
//!
//! Orchestration modules ([`provision`], [`ship`], [`batch`]) coordinate
//! core logic with I/O to implement the CLI commands.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod preflight;
pub mod provision;
pub mod ship;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
