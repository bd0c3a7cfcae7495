use std::{collections::BTreeSet, io::ErrorKind, path::Path};

use tracing::debug;

use crate::{Error, RandomSource, Result};

/// Deduplicated candidate lines loaded from a side file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplementalLineSet {
    lines: Vec<String>,
}

impl SupplementalLineSet {
    /// Load the set from `path`. A missing file yields an empty set.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Self::parse(&raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no supplemental lines file");
                Ok(Self::default())
            },
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Trimmed non-blank lines, duplicates collapsed.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let unique: BTreeSet<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self {
            lines: unique.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Pick one line uniformly, or `None` when the set is empty.
    pub fn choose(&self, random: &dyn RandomSource) -> Option<&str> {
        if self.lines.is_empty() {
            return None;
        }
        self.lines
            .get(random.pick_index(self.lines.len()))
            .map(String::as_str)
    }
}
