//! Registration document announced to the vbus directory service.
//!
//! Field names are fixed by the directory service, including the
//! `methode` spelling.

use crate::config::ElementConfig;
use serde::{Deserialize, Serialize};

/// Example `start` payload advertised to subscribers.
const START_FORMULA: &str = "{'format':3, 'rate':44100}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub path: String,
    pub name: String,
    pub uuid: String,
    pub tags: Vec<String>,
    pub publish: Vec<MethodDescriptor>,
}

/// One publishable method of the element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(rename = "methode")]
    pub method: String,
    pub format: PayloadFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

/// Encoding of a method's message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Json,
    Binary,
    None,
}

impl Element {
    pub fn from_config(config: &ElementConfig) -> Self {
        Self {
            path: config.path.clone(),
            name: config.name.clone(),
            uuid: config.uuid.clone(),
            tags: config.tags.clone(),
            publish: vec![
                MethodDescriptor {
                    method: "start".into(),
                    format: PayloadFormat::Json,
                    formula: Some(START_FORMULA.into()),
                },
                MethodDescriptor {
                    method: "play".into(),
                    format: PayloadFormat::Binary,
                    formula: None,
                },
                MethodDescriptor {
                    method: "stop".into(),
                    format: PayloadFormat::None,
                    formula: None,
                },
            ],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
