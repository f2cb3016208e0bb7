//! Advisory command classification.
//!
//! A command is classified by the basename of its first shell word, looked up
//! in the configured safe and dangerous name sets. This is classification
//! only; nothing here sandboxes or rewrites commands.

use crate::config::BashHelperConfig;
use crate::textutil::command_preview;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Result of classifying one command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SafetyClassification {
    Safe,
    Dangerous,
    Unknown,
}

impl SafetyClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Dangerous => "dangerous",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SafetyClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies shell commands from two configured name sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyAssessor {
    known_safe: BTreeSet<String>,
    dangerous: BTreeSet<String>,
}

impl SafetyAssessor {
    pub fn new<S, D>(known_safe: S, dangerous: D) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            known_safe: known_safe.into_iter().map(Into::into).collect(),
            dangerous: dangerous.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &BashHelperConfig) -> Self {
        Self::new(
            config.known_safe_commands.iter().cloned(),
            config.dangerous_commands.iter().cloned(),
        )
    }

    /// Classify `command`.
    ///
    /// Safe wins when a name is in both sets. Empty or unparseable input is
    /// always `Unknown`.
    pub fn classify(&self, command: &str) -> SafetyClassification {
        let classification = match base_command(command) {
            Some(name) if self.known_safe.contains(&name) => SafetyClassification::Safe,
            Some(name) if self.dangerous.contains(&name) => SafetyClassification::Dangerous,
            _ => SafetyClassification::Unknown,
        };
        tracing::debug!(command = %command_preview(command), %classification, "classified command");
        classification
    }

    /// True when the command's base name is in the safe set.
    pub fn is_known_safe(&self, command: &str) -> bool {
        self.classify(command) == SafetyClassification::Safe
    }
}

impl Default for SafetyAssessor {
    fn default() -> Self {
        Self::from_config(&BashHelperConfig::default())
    }
}

/// Basename of the first shell word, or `None` for empty/unparseable input.
pub fn base_command(command: &str) -> Option<String> {
    let words = shlex::split(command)?;
    let first = words.into_iter().next()?;
    let name = Path::new(&first).file_name()?.to_str()?.to_string();
    (!name.is_empty()).then_some(name)
}
