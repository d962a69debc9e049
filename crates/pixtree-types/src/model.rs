//! Per-model generation parameters.
//!
//! Different model families accept different parameter sets. [`ModelConfig`]
//! is a tagged sum discriminated by the `model` field; code that is not
//! model-specific only reads the shared [`ModelConfig::prompt`] and
//! [`ModelConfig::model_name`] accessors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generation parameters, one variant per supported model family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "kebab-case")]
pub enum ModelConfig {
    NanoBanana {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aspect_ratio: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
    },
    Seedream {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        guidance_scale: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    /// Any model without a dedicated variant. Parameters are kept opaque.
    Other {
        name: String,
        prompt: String,
        #[serde(default)]
        params: Value,
    },
}

impl ModelConfig {
    pub const NANO_BANANA: &'static str = "nano-banana";
    pub const SEEDREAM: &'static str = "seedream";

    /// Build a config with default parameters for the named model.
    pub fn for_model(name: &str, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        match name {
            Self::NANO_BANANA => Self::NanoBanana {
                prompt,
                aspect_ratio: None,
                temperature: None,
            },
            Self::SEEDREAM => Self::Seedream {
                prompt,
                width: None,
                height: None,
                guidance_scale: None,
                seed: None,
            },
            other => Self::Other {
                name: other.to_string(),
                prompt,
                params: Value::Null,
            },
        }
    }

    /// The prompt shared by every model family.
    pub fn prompt(&self) -> &str {
        match self {
            Self::NanoBanana { prompt, .. }
            | Self::Seedream { prompt, .. }
            | Self::Other { prompt, .. } => prompt,
        }
    }

    /// The model identifier, as used by search and usage statistics.
    pub fn model_name(&self) -> &str {
        match self {
            Self::NanoBanana { .. } => Self::NANO_BANANA,
            Self::Seedream { .. } => Self::SEEDREAM,
            Self::Other { name, .. } => name,
        }
    }

    /// Every non-prompt parameter flattened to `key -> value`.
    ///
    /// Nested `params` of [`ModelConfig::Other`] are flattened one level.
    pub fn parameters(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        if let Self::Other { params, .. } = self {
            match params {
                Value::Object(map) => {
                    for (k, v) in map {
                        out.insert(k.clone(), v.clone());
                    }
                }
                Value::Null => {}
                other => {
                    out.insert("params".to_string(), other.clone());
                }
            }
            return out;
        }
        if let Ok(Value::Object(map)) = serde_json::to_value(self) {
            for (k, v) in map {
                if k != "model" && k != "prompt" {
                    out.insert(k, v);
                }
            }
        }
        out
    }
}
