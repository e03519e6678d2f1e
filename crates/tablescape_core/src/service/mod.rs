//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repositories, capture and the live registry into use-case
//!   level store APIs.
//! - Expose immutable snapshots to readers; mutation goes through explicit
//!   APIs only.

pub mod catalog_service;
pub mod favorites_service;
pub mod formation_service;
