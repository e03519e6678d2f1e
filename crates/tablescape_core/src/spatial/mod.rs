//! Spatial placement core for the live AR session.
//!
//! # Responsibility
//! - Resolve world transforms for tapped screen points.
//! - Track live anchors and derive capture-time placed-product records.
//!
//! # Invariants
//! - Anchor identity and product tagging happen at placement time; nothing
//!   re-derives identity from the host scene graph later.
//! - Placement either creates exactly one anchored entity or fails with
//!   zero anchors created.

pub mod anchor_registry;
pub mod placement;
pub mod scene_spi;
