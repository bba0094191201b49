use crate::config::Config;

/// Subjects used by one plugin instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub start: String,
    pub play: String,
    pub stop: String,
    pub registration: String,
}

impl Topics {
    /// Derive event subjects from the element path, e.g.
    /// `system.audio.shairport-sync` -> `system.audio.shairport-sync.start`.
    pub fn new(element_path: &str, registration: impl Into<String>) -> Self {
        let base = element_path.trim_end_matches('.');
        Self {
            start: format!("{base}.start"),
            play: format!("{base}.play"),
            stop: format!("{base}.stop"),
            registration: registration.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.element.path, config.bus.registration_subject.clone())
    }
}
