pub mod config;
pub mod element;
pub mod format;
pub mod logging;
pub mod output;
pub mod paths;
pub mod topics;

pub use config::{
    AudioConfig, BusConfig, Config, ConfigError, ElementConfig, LogLevel, LoggingConfig,
    ValidationError, DEFAULT_BUS_URL, VBUS_URL_ENV,
};
pub use element::{Element, MethodDescriptor, PayloadFormat};
pub use format::{BackendSettings, SampleFormat, StreamFormat};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use output::{AudioOutput, OptionalHooks, OutputError, OutputResult};
pub use paths::{AppDirs, DirsError};
pub use topics::Topics;

pub const APP_NAME: &str = "vbus-source";
pub const APP_AUTHOR: &str = "vbus";
pub const APP_QUALIFIER: &str = "io";
