pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod upstream;

pub use error::{MissionError, Result};
pub use service::MissionService;
