pub mod config;
pub mod error;
pub mod task;

pub use config::{Config, SchedulerConfig};
pub use error::*;
pub use task::*;
