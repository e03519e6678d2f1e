//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tablescape_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    // Why: keep a tiny CLI probe to validate core crate wiring independently
    // from Flutter/FFI runtime setup.
    println!("tablescape_core ping={}", tablescape_core::ping());
    println!("tablescape_core version={}", tablescape_core::core_version());
}
