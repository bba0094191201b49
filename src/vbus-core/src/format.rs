use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample format code as handed over by the player.
///
/// The numeric codes are the player's own; unknown codes pass through as
/// [`SampleFormat::Other`] so nothing the host sends is ever rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    Unknown,
    S8,
    U8,
    S16,
    S16Le,
    S16Be,
    S24,
    S24Le,
    S24Be,
    S24_3Le,
    S24_3Be,
    S32,
    S32Le,
    S32Be,
    Auto,
    Invalid,
    Other(i32),
}

impl SampleFormat {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::S8,
            2 => Self::U8,
            3 => Self::S16,
            4 => Self::S16Le,
            5 => Self::S16Be,
            6 => Self::S24,
            7 => Self::S24Le,
            8 => Self::S24Be,
            9 => Self::S24_3Le,
            10 => Self::S24_3Be,
            11 => Self::S32,
            12 => Self::S32Le,
            13 => Self::S32Be,
            14 => Self::Auto,
            15 => Self::Invalid,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::S8 => 1,
            Self::U8 => 2,
            Self::S16 => 3,
            Self::S16Le => 4,
            Self::S16Be => 5,
            Self::S24 => 6,
            Self::S24Le => 7,
            Self::S24Be => 8,
            Self::S24_3Le => 9,
            Self::S24_3Be => 10,
            Self::S32 => 11,
            Self::S32Le => 12,
            Self::S32Be => 13,
            Self::Auto => 14,
            Self::Invalid => 15,
            Self::Other(code) => code,
        }
    }

    /// Bytes per sample for one channel, when the format defines it.
    pub fn bytes_per_sample(self) -> Option<usize> {
        match self {
            Self::S8 | Self::U8 => Some(1),
            Self::S16 | Self::S16Le | Self::S16Be => Some(2),
            Self::S24_3Le | Self::S24_3Be => Some(3),
            Self::S24 | Self::S24Le | Self::S24Be => Some(4),
            Self::S32 | Self::S32Le | Self::S32Be => Some(4),
            Self::Unknown | Self::Auto | Self::Invalid | Self::Other(_) => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "format#{code}"),
            known => write!(f, "{known:?}"),
        }
    }
}

impl Serialize for SampleFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for SampleFormat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::from_code)
    }
}

/// Payload of the `start` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub rate: i32,
    pub format: SampleFormat,
}

/// Backend parameters returned to the host from `init`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendSettings {
    pub buffer_desired_length: f64,
    pub latency_offset: f64,
}

impl From<&crate::config::AudioConfig> for BackendSettings {
    fn from(audio: &crate::config::AudioConfig) -> Self {
        Self {
            buffer_desired_length: audio.buffer_desired_length,
            latency_offset: audio.latency_offset,
        }
    }
}
