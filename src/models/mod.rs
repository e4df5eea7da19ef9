mod actor;
mod message;
mod patient;
mod task;
mod validators;

pub use actor::*;
pub use message::*;
pub use patient::*;
pub use task::*;
