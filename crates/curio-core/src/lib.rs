pub mod config;
pub mod error;
pub mod record;
pub mod storage;
pub mod traits;
pub mod types;

pub use config::{AppConfig, PipelineConfig, ValidationPaths};
pub use error::{CurioError, Result};
pub use record::*;
pub use types::*;
