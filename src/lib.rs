pub mod budget;
pub mod correlation;
pub mod error;
pub mod mechanisms;
pub mod sanitizer;
pub mod trajectories;

pub use error::{Error, Result};
pub use sanitizer::core::sanitize;
