//! Stable exit codes for shipper CLI commands.

/// Command completed.
pub const OK: i32 = 0;
/// Command failed: bad arguments, a broken environment, or a pipeline error.
pub const INVALID: i32 = 1;
/// `setup` or `ship` paused on a checkpoint that needs an operator decision.
pub const PENDING: i32 = 2;
