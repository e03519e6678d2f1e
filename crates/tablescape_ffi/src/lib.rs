//! Flutter-facing FFI surface for the Tablescape core.

pub mod api;
