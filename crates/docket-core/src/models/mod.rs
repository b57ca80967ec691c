//! Data models shared by extraction, validation, and sync.

pub mod config;
pub mod document;
pub mod report;
pub mod shipment;
pub mod sync;
