use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::bail;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A repository identifier of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    full: Arc<str>,
    slash: usize,
}

impl RepoId {
    /// Parse an `owner/name` identifier, ignoring surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some((owner, name)) = s.split_once('/') else {
            bail!("invalid repository identifier '{s}': expected 'owner/name'");
        };
        if owner.is_empty() || name.is_empty() {
            bail!("invalid repository identifier '{s}': empty owner or name");
        }

        if name.contains('/') || s.chars().any(char::is_whitespace) {
            bail!("invalid repository identifier '{s}': expected 'owner/name'");
        }

        Ok(Self {
            full: Arc::from(s),
            slash: owner.len(),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        self.full.split_at(self.slash).0
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.full.split_at(self.slash + 1).1
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl Display for RepoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.full)
    }
}

impl TryFrom<String> for RepoId {
    type Error = ohno::AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RepoId> for String {
    fn from(value: RepoId) -> Self {
        value.full.to_string()
    }
}
