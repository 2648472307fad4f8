//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep scoring pure and storage-agnostic.
//! - Keep API/CLI layers decoupled from storage details.

pub mod assessment_service;
pub mod report_templates;
pub mod scoring;
