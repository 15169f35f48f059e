//! Station names and route-pattern station entries.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Error returned when constructing an invalid station name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station name: {reason}")]
pub struct InvalidStationName {
    reason: &'static str,
}

/// The canonical name of a station.
///
/// Names are the stable identity of stations across route patterns, so two
/// patterns calling at "Central" share that station. Names must be non-empty
/// and are compared exactly. Cloning is cheap.
///
/// # Examples
///
/// ```
/// use dispatch_scheduler::domain::StationName;
///
/// let name = StationName::new("Central").unwrap();
/// assert_eq!(name.as_str(), "Central");
///
/// assert!(StationName::new("").is_err());
/// assert!(StationName::new("   ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationName(Arc<str>);

impl StationName {
    /// Create a station name, rejecting blank strings.
    pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidStationName> {
        let s = s.as_ref();
        if s.trim().is_empty() {
            return Err(InvalidStationName {
                reason: "station name cannot be blank",
            });
        }
        Ok(StationName(Arc::from(s)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StationName {
    type Error = InvalidStationName;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        StationName::new(s)
    }
}

impl From<StationName> for String {
    fn from(name: StationName) -> Self {
        name.as_str().to_string()
    }
}

impl std::borrow::Borrow<str> for StationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationName({})", self.0)
    }
}

impl fmt::Display for StationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A station defined inline inside a route pattern rather than referenced
/// by name. Only the name takes part in scheduling; the remaining fields are
/// carried through for callers that need them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDefinition {
    pub name: StationName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
}

/// One entry in a route pattern's station list.
///
/// In JSON an entry is either a bare string or an object with at least a
/// `name` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationRef {
    Named(StationName),
    Inline(StationDefinition),
}

impl StationRef {
    /// The canonical name this entry resolves to.
    pub fn name(&self) -> &StationName {
        match self {
            StationRef::Named(name) => name,
            StationRef::Inline(def) => &def.name,
        }
    }
}

impl From<StationName> for StationRef {
    fn from(name: StationName) -> Self {
        StationRef::Named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid_name() {
        assert!(StationName::new("a").is_ok());
        assert!(StationName::new("King's Cross").is_ok());
    }

    #[test]
    fn reject_blank() {
        let err = StationName::new(" ").unwrap_err();
        assert_eq!(err.to_string(), "invalid station name: station name cannot be blank");
    }

    #[test]
    fn display_and_debug() {
        let name = StationName::new("Central").unwrap();
        assert_eq!(format!("{}", name), "Central");
        assert_eq!(format!("{:?}", name), "StationName(Central)");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = StationName::new("a").unwrap();
        let b = StationName::new("b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn deserialize_named_entry() {
        let entry: StationRef = serde_json::from_str("\"Central\"").unwrap();
        assert_eq!(entry, StationRef::Named(StationName::new("Central").unwrap()));
        assert_eq!(entry.name().as_str(), "Central");
    }

    #[test]
    fn deserialize_inline_entry() {
        let json = r#"{"name": "Harbour", "id": "H1", "municipality": "Port"}"#;
        let entry: StationRef = serde_json::from_str(json).unwrap();
        match &entry {
            StationRef::Inline(def) => {
                assert_eq!(def.id.as_deref(), Some("H1"));
                assert_eq!(def.location, None);
            }
            StationRef::Named(_) => panic!("expected inline definition"),
        }
        assert_eq!(entry.name().as_str(), "Harbour");
    }

    #[test]
    fn deserialize_rejects_blank_name() {
        assert!(serde_json::from_str::<StationRef>("\"\"").is_err());
    }
}
