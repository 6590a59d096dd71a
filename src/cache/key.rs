//! Cache key computation using BLAKE3
//!
//! CacheKey = hash("generation-task" || canonical_json(prompt, negative_prompt, style))
//!
//! The canonical form is a sorted-field JSON document, so the same semantic task
//! content always yields the same key regardless of field order or task id.

use crate::types::{GenerationTask, StyleParameters};
use blake3::Hasher;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

const KEY_DOMAIN: &[u8] = b"generation-task";

/// Content address of a task's semantic payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a task; the task id and its scheduling fields do not participate.
    pub fn for_task(task: &GenerationTask) -> Self {
        Self::compute(&task.prompt, &task.negative_prompt, &task.style)
    }

    pub fn compute(prompt: &str, negative_prompt: &str, style: &StyleParameters) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(&canonical_payload(prompt, negative_prompt, style));
        CacheKey(hex::encode(hasher.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for logs and tables.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct CanonicalTask<'a> {
    negative_prompt: String,
    prompt: String,
    style: BTreeMap<&'static str, &'a str>,
}

/// Sorted-field serialization of the task content. Text is NFC-normalized.
pub fn canonical_payload(prompt: &str, negative_prompt: &str, style: &StyleParameters) -> Vec<u8> {
    let canonical = CanonicalTask {
        negative_prompt: negative_prompt.nfc().collect(),
        prompt: prompt.nfc().collect(),
        style: style.canonical_fields(),
    };
    // Struct fields are declared in sorted order and the style map is a BTreeMap.
    serde_json::to_vec(&canonical).unwrap_or_default()
}
