//! Parameter stores holding prompt templates and version pointers

use crate::StoreError;
use claimline_domain::traits::ParameterStore;
use claimline_domain::ServiceError;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory parameter store
#[derive(Debug, Clone, Default)]
pub struct MemoryParameterStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryParameterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a parameter
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(name.into(), value.into());
        }
    }
}

impl ParameterStore for MemoryParameterStore {
    fn get_parameter(&self, name: &str) -> Result<Option<String>, ServiceError> {
        let values = self
            .values
            .lock()
            .map_err(|_| ServiceError::Unavailable("parameter store lock poisoned".into()))?;
        Ok(values.get(name).cloned())
    }
}

/// Parameter store backed by a directory tree
///
/// The parameter `/claimline/prompts/fraud_agent/latest` is read from
/// `<root>/claimline/prompts/fraud_agent/latest`.
pub struct DirParameterStore {
    root: PathBuf,
}

impl DirParameterStore {
    /// Create a store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name.trim_start_matches('/'));
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(StoreError::InvalidKey(name.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(name)?) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ParameterStore for DirParameterStore {
    fn get_parameter(&self, name: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.read(name)?)
    }
}
