//! The environment catalog maps named environments to container images.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{SandgateError, SandgateResult};

use super::defaults::DEFAULT_AIO_IMAGE;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A named sandbox environment from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique environment name.
    pub name: String,

    /// Container image backing the environment.
    pub image: String,

    /// Human-readable description shown to callers.
    pub description: String,
}

/// A listing entry safe to expose to callers. Omits the image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSummary {
    /// Environment name.
    pub name: String,

    /// Environment description.
    pub description: String,
}

/// The set of environments this gateway offers.
#[derive(Debug, Clone)]
pub struct EnvironmentCatalog {
    entries: Vec<Environment>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EnvironmentCatalog {
    /// Loads a catalog from a JSON file and validates every entry.
    pub fn load(path: impl AsRef<Path>) -> SandgateResult<Self> {
        let path = path.as_ref();
        tracing::info!("loading environment catalog from {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<Environment> = serde_json::from_str(&raw)?;

        Self::from_entries(entries)
    }

    /// Builds a catalog from in-memory entries, validating each one.
    pub fn from_entries(entries: Vec<Environment>) -> SandgateResult<Self> {
        if entries.is_empty() {
            return Err(SandgateError::validation("environment catalog is empty"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for env in &entries {
            if env.name.is_empty() || env.image.is_empty() || env.description.is_empty() {
                return Err(SandgateError::validation(format!(
                    "environment entry must set name, image and description: {env:?}"
                )));
            }
            if !seen.insert(env.name.clone()) {
                return Err(SandgateError::validation(format!(
                    "duplicate environment name: {}",
                    env.name
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Returns the built-in catalog used when no file is configured.
    pub fn default_catalog() -> Self {
        Self {
            entries: vec![Environment {
                name: "aio".to_string(),
                image: DEFAULT_AIO_IMAGE.to_string(),
                description: "All-in-one sandbox with browser, shell and code runtimes".to_string(),
            }],
        }
    }

    /// Looks up an environment by name.
    pub fn get(&self, name: &str) -> Option<&Environment> {
        self.entries.iter().find(|env| env.name == name)
    }

    /// Returns every configured environment.
    pub fn entries(&self) -> &[Environment] {
        &self.entries
    }

    /// Returns the caller-facing listing without image references.
    pub fn summaries(&self) -> Vec<EnvironmentSummary> {
        self.entries
            .iter()
            .map(|env| EnvironmentSummary {
                name: env.name.clone(),
                description: env.description.clone(),
            })
            .collect()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
