//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep transport layers decoupled from storage details.
//!
//! # Invariants
//! - Services receive repository handles and caller identity explicitly;
//!   nothing is read from ambient state.

pub mod item_service;
pub mod shelf_service;
pub mod user_service;
