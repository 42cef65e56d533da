// file: src/config/loader.rs
// version: 1.0.0
// guid: 54ffd852-1be0-4633-a9f1-535da3639daf

//! Settings file loading with process environment precedence

use super::Config;
use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Settings loader. Values already set in the process environment win over the file.
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a loader seeded with the current process environment
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Create a loader that ignores the process environment
    pub fn isolated() -> Self {
        Self {
            env_vars: HashMap::new(),
        }
    }

    /// Set a variable that takes precedence over the settings file
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    /// Load the configuration from a `.env` style file. The file must exist and parse.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let file_vars = read_env_file(path)?;
        debug!("Read {} settings from {}", file_vars.len(), path.display());

        Ok(Config::from_lookup(|key| {
            self.env_vars
                .get(key)
                .or_else(|| file_vars.get(key))
                .cloned()
        }))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        crate::error::PrepperError::config(format!(
            "Error loading settings file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            crate::error::PrepperError::config(format!(
                "Error parsing settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        vars.insert(key, value);
    }

    Ok(vars)
}
