//! Logging bootstrap.
//!
//! The teacher crate depends on `log` + `env_logger` but never calls
//! either; this crate exercises them. Call [`init`] once, from `main`,
//! before constructing any component.

/// Initialize the `env_logger` backend for the `log` facade.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    let _ = env_logger::try_init();
}
