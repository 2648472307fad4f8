//! Assessment domain model.
//!
//! # Responsibility
//! - Define the read-only catalog hierarchy (tool > domain > category > criterion).
//! - Define assessment, response and guest session records owned by core.
//!
//! # Invariants
//! - Catalog records are never mutated by assessment use-cases.
//! - Every assessment is owned by exactly one `OwnerRef`.

pub mod assessment;
pub mod catalog;
pub mod response;
