pub mod client;
pub mod error;
pub mod fallback;

pub use client::{DEFAULT_CLIENT_TTL, MissionClient};
pub use error::{ClientError, Result};
