//! Groups: named, saved regular expressions
//!
//! A group can be used as a selector term (`` `name` ``) and is resolved to
//! its saved regex every time a selector is compiled.
//!
//! Groups optionally persist to a JSON file. `create` and `delete` hold a
//! mutation lock across the in-memory change and the file write, so the
//! file always reflects a state the store actually passed through:
//!
//! ```json
//! { "schema": 1, "groups": [ { "name": "linux", "expression": { "body": "linux-.*", "case_insensitive": false } } ] }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, EvalError, EvalResult, Result};
use crate::selector::RegexLiteral;

/// Current groups file schema
const GROUPS_SCHEMA: u32 = 1;

/// Maximum length of a group name in bytes
pub const MAX_GROUP_NAME_LEN: usize = 255;

/// A saved group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,
    /// Saved regex
    pub expression: RegexLiteral,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupsFile {
    schema: u32,
    groups: Vec<Group>,
}

/// Store of named groups
#[derive(Debug, Default)]
pub struct GroupStore {
    groups: RwLock<BTreeMap<String, RegexLiteral>>,

    /// Serializes persisted mutations and file writes
    mutation: Mutex<()>,

    /// Backing file, if persistence is enabled
    path: Option<PathBuf>,
}

impl GroupStore {
    /// Create an in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading existing groups
    ///
    /// A missing file is treated as an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut groups = BTreeMap::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: GroupsFile = serde_json::from_str(&contents).map_err(|e| {
                Error::Serialization(format!("Failed to parse groups file {}: {}", path.display(), e))
            })?;
            if file.schema != GROUPS_SCHEMA {
                return Err(Error::Serialization(format!(
                    "Unsupported groups file schema {} (expected {})",
                    file.schema, GROUPS_SCHEMA
                )));
            }
            for group in file.groups {
                groups.insert(group.name, group.expression);
            }
            info!(count = groups.len(), path = %path.display(), "loaded groups");
        }

        Ok(Self {
            groups: RwLock::new(groups),
            mutation: Mutex::new(()),
            path: Some(path),
        })
    }

    /// Add a group and persist the store
    ///
    /// When the write fails the group is removed again and the write error
    /// is returned.
    pub fn create(&self, name: &str, expression: RegexLiteral) -> Result<()> {
        let _guard = self.mutation.lock();
        self.insert(name, expression)?;

        if let Err(e) = self.write_file() {
            warn!(group = name, error = %e, "failed to save groups, reverting create");
            if let Err(rollback) = self.remove(name) {
                warn!(group = name, error = %rollback, "failed to revert create");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove a group and persist the store
    ///
    /// When the write fails the group is restored and the write error is
    /// returned.
    pub fn delete(&self, name: &str) -> Result<RegexLiteral> {
        let _guard = self.mutation.lock();
        let expression = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownGroup(name.to_string()))?;
        self.remove(name)?;

        if let Err(e) = self.write_file() {
            warn!(group = name, error = %e, "failed to save groups, reverting drop");
            if let Err(rollback) = self.insert(name, expression) {
                warn!(group = name, error = %rollback, "failed to revert drop");
            }
            return Err(e);
        }
        Ok(expression)
    }

    /// Add a group
    pub fn insert(&self, name: &str, expression: RegexLiteral) -> EvalResult<()> {
        validate_group_name(name)?;

        let mut groups = self.groups.write();
        if groups.contains_key(name) {
            return Err(EvalError::GroupExists(name.to_string()));
        }
        groups.insert(name.to_string(), expression);
        debug!(group = name, "created group");
        Ok(())
    }

    /// Remove a group
    pub fn remove(&self, name: &str) -> EvalResult<()> {
        match self.groups.write().remove(name) {
            Some(_) => {
                debug!(group = name, "dropped group");
                Ok(())
            },
            None => Err(EvalError::UnknownGroup(name.to_string())),
        }
    }

    /// Saved regex of a group
    pub fn get(&self, name: &str) -> Option<RegexLiteral> {
        self.groups.read().get(name).cloned()
    }

    /// All groups ordered by name
    pub fn list(&self) -> Vec<Group> {
        self.groups
            .read()
            .iter()
            .map(|(name, expression)| Group {
                name: name.clone(),
                expression: expression.clone(),
            })
            .collect()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Check if there are no groups
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Write all groups to the backing file, if any
    ///
    /// Writes to a temporary file first and renames it into place.
    pub fn save(&self) -> Result<()> {
        let _guard = self.mutation.lock();
        self.write_file()
    }

    /// Caller holds the mutation lock
    fn write_file(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = GroupsFile {
            schema: GROUPS_SCHEMA,
            groups: self.list(),
        };
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Serialization(format!("Failed to serialize groups: {}", e)))?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;

        let renamed = std::fs::rename(&tmp, path);
        if renamed.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        renamed?;
        Ok(())
    }
}

/// Validate a group name
fn validate_group_name(name: &str) -> EvalResult<()> {
    if name.is_empty()
        || name.len() > MAX_GROUP_NAME_LEN
        || name.chars().any(|c| c == '`' || c.is_control())
    {
        return Err(EvalError::InvalidGroupName(name.to_string()));
    }
    Ok(())
}
