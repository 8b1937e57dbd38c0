//! Workflows that span several repositories but need no transaction

pub mod accounts;
pub mod dashboard;

pub use accounts::{AccountKind, ProfileChanges, Session};
pub use dashboard::DashboardStats;
