#![forbid(unsafe_code)]
pub use error::Error;
pub use settings::Settings;

pub mod error;
mod settings;
