pub mod provision;
pub mod service;
pub mod types;

pub use service::{HealthReport, MemoryService};
