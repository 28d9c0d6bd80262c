use crate::error::{Result, WsError};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of freshly generated identifiers. Short enough to keep derived
/// resource names well below the 63-character DNS label limit.
const GENERATED_LEN: usize = 16;

/// Longest identifier accepted when parsing. Resource names are derived as
/// `ws-{id}` and must stay valid DNS-1035 labels.
const MAX_LEN: usize = 48;

/// Opaque, cluster-unique token naming one workspace.
///
/// Immutable for the workspace lifetime; all resource names and label
/// selectors are derived from it. A deleted identifier is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Generate a fresh random identifier (lowercase alphanumeric, URL and
    /// DNS safe).
    pub fn random() -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_LEN)
            .map(char::from)
            .collect();
        WorkspaceId(token.to_lowercase())
    }

    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > MAX_LEN {
            return Err(WsError::PathValidation(format!(
                "workspace id must be 1..={MAX_LEN} characters: {s:?}"
            )));
        }
        let valid = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid || s.starts_with('-') || s.ends_with('-') {
            return Err(WsError::PathValidation(format!(
                "workspace id may only contain lowercase alphanumerics and inner dashes: {s:?}"
            )));
        }
        Ok(WorkspaceId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = WsError;

    fn from_str(s: &str) -> Result<Self> {
        WorkspaceId::parse(s)
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = WsError;

    fn try_from(s: String) -> Result<Self> {
        WorkspaceId::parse(&s)
    }
}

impl From<WorkspaceId> for String {
    fn from(id: WorkspaceId) -> String {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_dns_safe_and_unique() {
        let a = WorkspaceId::random();
        let b = WorkspaceId::random();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), GENERATED_LEN);
        assert!(a
            .as_str()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn parse_rejects_invalid_tokens() {
        assert!(WorkspaceId::parse("").is_err());
        assert!(WorkspaceId::parse("Upper").is_err());
        assert!(WorkspaceId::parse("has space").is_err());
        assert!(WorkspaceId::parse("-leading").is_err());
        assert!(WorkspaceId::parse("trailing-").is_err());
        assert!(WorkspaceId::parse(&"x".repeat(MAX_LEN + 1)).is_err());
        assert!(WorkspaceId::parse("ab-12cd").is_ok());
    }
}
