pub mod config;
pub mod error;

pub use config::SentioConfig;
pub use error::{Result, SentioError};
