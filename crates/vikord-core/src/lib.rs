pub mod api;
pub mod config;
pub mod error;
pub mod types;

pub use api::{TaskApi, TaskPatch};
pub use config::VikordConfig;
pub use error::{Result, VikordError};
