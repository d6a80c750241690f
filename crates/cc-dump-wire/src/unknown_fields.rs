use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Captures any JSON object fields not modeled by a struct's named fields.
///
/// Flattened into wire structs via `#[serde(flatten)]` so that unrecognized
/// upstream additions survive a deserialize/serialize round trip instead of
/// being silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnknownFields(#[serde(flatten)] pub HashMap<String, serde_json::Value>);

impl UnknownFields {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
