use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A known person: display name plus reference image locators, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(rename = "img", default)]
    pub images: Vec<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            name: name.into(),
            images,
        }
    }
}

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid roster JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("roster entry {index} has an empty name")]
    EmptyName { index: usize },
}

/// The static list of identities, in configuration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Roster {
    identities: Vec<Identity>,
}

impl Roster {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    /// Parses a JSON list of `{ "name": ..., "img": [...] }` entries.
    pub fn from_json_str(json: &str) -> Result<Self, RosterError> {
        let identities: Vec<Identity> = serde_json::from_str(json)?;
        if let Some(index) = identities.iter().position(|i| i.name.trim().is_empty()) {
            return Err(RosterError::EmptyName { index });
        }
        Ok(Self { identities })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RosterError> {
        let json = std::fs::read_to_string(path).map_err(|e| RosterError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&json)
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
