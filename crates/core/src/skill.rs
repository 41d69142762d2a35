//! Skill documents: named instruction sets injected into a run's context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The outcome of loading one skill, successful or not.
///
/// A failed load is still a `Skill` (with `loaded == false`) so that it can
/// be cached as a negative result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,

    /// Raw document text; `None` when the load failed
    pub content: Option<String>,

    pub path: Option<PathBuf>,

    pub loaded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,

    /// Front matter key/value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,

    /// Document body after the front matter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Skill {
    pub fn loaded(
        name: impl Into<String>,
        content: String,
        path: Option<PathBuf>,
        meta: BTreeMap<String, String>,
        body: String,
    ) -> Self {
        Self {
            name: name.into(),
            content: Some(content),
            path,
            loaded: true,
            error: None,
            loaded_at: Some(Utc::now()),
            meta,
            body: Some(body),
        }
    }

    pub fn failed(
        name: impl Into<String>,
        path: Option<PathBuf>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: None,
            path,
            loaded: false,
            error: Some(error.into()),
            loaded_at: None,
            meta: BTreeMap::new(),
            body: None,
        }
    }
}
