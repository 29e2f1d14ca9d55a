//! Domain models for the Pharma Inventory Platform

pub mod alert;
pub mod demand;
pub mod drug;
pub mod inventory;
pub mod reorder;

pub use alert::*;
pub use demand::*;
pub use drug::*;
pub use inventory::*;
pub use reorder::*;
