// baton/demos/dispatch_demo/src/services/mod.rs

pub mod mock_store;

pub use mock_store::{AuditRecord, MockStore, Notification};
