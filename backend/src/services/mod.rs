//! Business logic services for the Pharma Inventory Platform

pub mod activity;
pub mod alerts;
pub mod inventory;
pub mod reorder;

pub use activity::ActivityLogService;
pub use alerts::AlertService;
pub use inventory::InventoryService;
pub use reorder::ReorderService;
