use crate::format::{BackendSettings, SampleFormat};
use thiserror::Error;

/// Output backend errors surfaced to the host.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output backend unavailable: {0}")]
    Backend(String),
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Optional host callbacks a backend may provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionalHooks {
    pub flush: bool,
    pub delay: bool,
    pub volume: bool,
    pub parameters: bool,
    pub mute: bool,
}

/// The plugin record a player invokes at fixed lifecycle points.
///
/// Calls arrive from a single host thread in the order
/// `init`, (`start`, `play`*, `stop`)*, `deinit`.
pub trait AudioOutput: Send {
    fn name(&self) -> &str;

    fn help(&self) -> &'static str;

    fn init(&mut self, args: &[String]) -> OutputResult<BackendSettings>;

    fn deinit(&mut self);

    fn start(&mut self, sample_rate: i32, sample_format: SampleFormat);

    fn play(&mut self, buffer: &[u8], sample_count: usize);

    fn stop(&mut self);

    fn optional_hooks(&self) -> OptionalHooks {
        OptionalHooks::default()
    }
}
