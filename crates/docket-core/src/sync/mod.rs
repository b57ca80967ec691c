//! Reconciling extracted fields back into the shipment record.

pub mod placeholder;
mod reconciler;

pub use placeholder::PlaceholderDetector;
pub use reconciler::{ApplyPlan, SyncReconciler};
