//! HTTP handlers for the Pharma Inventory Platform

pub mod alerts;
pub mod health;
pub mod inventory;
pub mod reorder;

pub use alerts::*;
pub use health::*;
pub use inventory::*;
pub use reorder::*;
