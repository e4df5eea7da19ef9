//! One policy per resource type.

mod dashboard;
mod message;
mod patient;
mod task;

pub use dashboard::{Dashboard, DashboardPolicy};
pub use message::MessagePolicy;
pub use patient::PatientPolicy;
pub use task::TaskPolicy;
