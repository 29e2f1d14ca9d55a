//! Shared types and models for the Pharma Inventory Platform
//!
//! This crate contains the domain model and the pure decision algorithms
//! (demand statistics, reorder policy, alert rules) shared between the
//! backend service and its tests. It performs no I/O.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::*;
