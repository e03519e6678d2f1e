//! Unified domain model for catalog, placement and formation persistence.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one storage shape shared by the live AR session and the persisted
//!   formation index.
//!
//! # Invariants
//! - Every domain object is identified by a stable uuid.
//! - Persisted numeric records are validated on decode, never silently
//!   corrected.

pub mod formation;
pub mod product;
pub mod transform;
