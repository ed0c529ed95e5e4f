//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ModuleName`] - Validated schema module name
//! - [`Revision`] - Module revision date (`YYYY-MM-DD`)
//! - [`Fingerprint`] - Content hash of the persisted registry
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use modreg::core::types::{ModuleName, Revision};
//!
//! let name = ModuleName::new("ietf-interfaces").unwrap();
//! let rev = Revision::new("2014-05-08").unwrap();
//! assert_eq!(name.as_str(), "ietf-interfaces");
//! assert_eq!(rev.as_str(), "2014-05-08");
//!
//! assert!(ModuleName::new("9lives").is_err());
//! assert!(Revision::new("2014-13-01").is_err());
//! ```

use std::borrow::Borrow;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid module name: {0}")]
    InvalidModuleName(String),

    #[error("invalid revision: {0}")]
    InvalidRevision(String),
}

/// A validated schema module name.
///
/// Module names follow the identifier rules of the modeling language:
/// - Cannot be empty
/// - Must start with an ASCII letter or `_`
/// - May contain only ASCII letters, digits, `_`, `-` and `.`
/// - Cannot start with `xml` in any letter case (reserved)
///
/// # Example
///
/// ```
/// use modreg::core::types::ModuleName;
///
/// assert!(ModuleName::new("iana-if-type").is_ok());
/// assert!(ModuleName::new("_private.v2").is_ok());
///
/// assert!(ModuleName::new("").is_err());
/// assert!(ModuleName::new("-lead").is_err());
/// assert!(ModuleName::new("XMLish").is_err());
/// assert!(ModuleName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a new validated module name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidModuleName` if the name is not a valid identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let mut chars = name.chars();
        let first = chars
            .next()
            .ok_or_else(|| TypeError::InvalidModuleName("module name cannot be empty".into()))?;

        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(TypeError::InvalidModuleName(format!(
                "'{name}' must start with a letter or '_'"
            )));
        }

        let invalid = |c: &char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if let Some(c) = chars.find(invalid) {
            return Err(TypeError::InvalidModuleName(format!(
                "'{name}' cannot contain '{c}'"
            )));
        }

        if name.len() >= 3 && name[..3].eq_ignore_ascii_case("xml") {
            return Err(TypeError::InvalidModuleName(format!(
                "'{name}' cannot start with 'xml'"
            )));
        }

        Ok(())
    }

    /// Get the module name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A module revision date in `YYYY-MM-DD` form.
///
/// The date must exist on the calendar. Revisions order chronologically,
/// which for this format coincides with lexical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(String);

impl Revision {
    /// Create a new validated revision.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRevision` if the value is not a `YYYY-MM-DD` date.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        // chrono accepts unpadded fields, the canonical form does not
        if value.len() != 10 || NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_err() {
            return Err(TypeError::InvalidRevision(value));
        }
        Ok(Self(value))
    }

    /// Get the revision as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Revision {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Revision> for String {
    fn from(rev: Revision) -> Self {
        rev.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A content hash of the persisted registry.
///
/// Used to detect that the persisted registry changed underneath an open
/// handle (another process wrote it).
///
/// # Example
///
/// ```
/// use modreg::core::types::Fingerprint;
///
/// let a = Fingerprint::compute(b"{\"name\":\"modules\"}");
/// let b = Fingerprint::compute(b"{\"name\":\"modules\"}");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint over raw persisted bytes.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod module_name {
        use super::*;

        #[test]
        fn valid_module_names() {
            assert!(ModuleName::new("test").is_ok());
            assert!(ModuleName::new("ietf-interfaces").is_ok());
            assert!(ModuleName::new("ops-ref").is_ok());
            assert!(ModuleName::new("A_b.c-9").is_ok());
            assert!(ModuleName::new("_x").is_ok());
        }

        #[test]
        fn empty_name_rejected() {
            assert!(ModuleName::new("").is_err());
        }

        #[test]
        fn leading_digit_rejected() {
            assert!(ModuleName::new("1abc").is_err());
        }

        #[test]
        fn xml_prefix_rejected_any_case() {
            assert!(ModuleName::new("xml").is_err());
            assert!(ModuleName::new("XmlThing").is_err());
            assert!(ModuleName::new("xm").is_ok());
        }

        #[test]
        fn invalid_chars_rejected() {
            for bad in ["a b", "a/b", "a:b", "a@b", "ü"] {
                assert!(ModuleName::new(bad).is_err(), "{bad} should be rejected");
            }
        }

        #[test]
        fn serde_roundtrip() {
            let name = ModuleName::new("refs").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, "\"refs\"");
            let parsed: ModuleName = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, name);
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<ModuleName, _> = serde_json::from_str("\"0bad\"");
            assert!(parsed.is_err());
        }

        #[test]
        fn borrow_allows_str_lookup() {
            let mut set = std::collections::HashSet::new();
            set.insert(ModuleName::new("test").unwrap());
            assert!(set.contains("test"));
        }
    }

    mod revision {
        use super::*;

        #[test]
        fn valid_revision() {
            let rev = Revision::new("2014-05-08").unwrap();
            assert_eq!(rev.as_str(), "2014-05-08");
            assert!(Revision::new("2014-5-8").is_err());
        }

        #[test]
        fn impossible_dates_rejected() {
            assert!(Revision::new("2014-02-30").is_err());
            assert!(Revision::new("2014-13-01").is_err());
        }

        #[test]
        fn unpadded_rejected() {
            assert!(Revision::new("2014-5-8").is_err());
        }

        #[test]
        fn ordering_is_chronological() {
            let older = Revision::new("2013-12-31").unwrap();
            let newer = Revision::new("2014-01-01").unwrap();
            assert!(older < newer);
        }
    }

    mod fingerprint {
        use super::*;

        #[test]
        fn differs_for_different_content() {
            assert_ne!(Fingerprint::compute(b"a"), Fingerprint::compute(b"b"));
        }

        #[test]
        fn short_is_prefix() {
            let fp = Fingerprint::compute(b"abc");
            assert_eq!(fp.short(7), &fp.as_str()[..7]);
            assert_eq!(fp.short(1000), fp.as_str());
        }
    }
}
