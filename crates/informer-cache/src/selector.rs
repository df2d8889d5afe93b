//! Label selectors for lister range queries.

use std::collections::BTreeMap;
use std::fmt;

use informer_core::{InformerError, InformerResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operator {
    Equals(String),
    NotEquals(String),
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    key: String,
    op: Operator,
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match &self.op {
            Operator::Equals(expected) => value == Some(expected),
            // A missing label satisfies `!=`.
            Operator::NotEquals(expected) => value != Some(expected),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Operator::Equals(v) => write!(f, "{}={}", self.key, v),
            Operator::NotEquals(v) => write!(f, "{}!={}", self.key, v),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// Equality-based label selector.
///
/// All requirements must hold (logical AND). The empty selector matches
/// every object.
///
/// # Example
///
/// ```rust
/// use informer_cache::Selector;
/// use std::collections::BTreeMap;
///
/// let selector = Selector::parse("app=web,tier!=cache,!canary").unwrap();
/// let mut labels = BTreeMap::new();
/// labels.insert("app".to_string(), "web".to_string());
/// assert!(selector.matches(&labels));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Selector that matches everything.
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector requiring every given label to be present with that value.
    #[must_use]
    pub fn from_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            requirements: labels
                .into_iter()
                .map(|(k, v)| Requirement {
                    key: k.into(),
                    op: Operator::Equals(v.into()),
                })
                .collect(),
        }
    }

    /// Parse a selector such as `app=web,tier!=cache,env,!canary`.
    ///
    /// Supported terms are `k=v`, `k==v`, `k!=v`, `k` (exists) and `!k`
    /// (does not exist), joined by commas.
    pub fn parse(input: &str) -> InformerResult<Self> {
        let invalid = |reason: &str| InformerError::InvalidSelector {
            selector: input.to_string(),
            reason: reason.to_string(),
        };

        let mut requirements = Vec::new();
        for term in input.split(',').map(str::trim) {
            if term.is_empty() {
                if input.trim().is_empty() {
                    continue;
                }
                return Err(invalid("empty term"));
            }

            let requirement = if let Some((key, value)) = term.split_once("!=") {
                Requirement {
                    key: key.trim().to_string(),
                    op: Operator::NotEquals(value.trim().to_string()),
                }
            } else if let Some((key, value)) = term.split_once("==") {
                Requirement {
                    key: key.trim().to_string(),
                    op: Operator::Equals(value.trim().to_string()),
                }
            } else if let Some((key, value)) = term.split_once('=') {
                Requirement {
                    key: key.trim().to_string(),
                    op: Operator::Equals(value.trim().to_string()),
                }
            } else if let Some(key) = term.strip_prefix('!') {
                Requirement {
                    key: key.trim().to_string(),
                    op: Operator::DoesNotExist,
                }
            } else {
                Requirement {
                    key: term.to_string(),
                    op: Operator::Exists,
                }
            };

            if requirement.key.is_empty() {
                return Err(invalid("missing label key"));
            }
            if !is_label_token(&requirement.key) {
                return Err(invalid("malformed label key"));
            }
            if let Operator::Equals(value) | Operator::NotEquals(value) = &requirement.op {
                if !is_label_token(value) {
                    return Err(invalid("malformed label value"));
                }
            }
            requirements.push(requirement);
        }

        Ok(Self { requirements })
    }

    /// Whether the selector matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Test a label set against the selector.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

/// Keys and values may not contain operator characters or whitespace.
fn is_label_token(token: &str) -> bool {
    !token.contains(|c: char| c == '=' || c == '!' || c.is_whitespace())
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}
