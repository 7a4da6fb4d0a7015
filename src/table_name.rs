use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TableError, TableResult};

/// Namespace used when a name carries no `ns:` prefix.
pub const DEFAULT_NAMESPACE: &str = "default";

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("namespace pattern compiles"));

static QUALIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").expect("qualifier pattern compiles")
});

/// Validated `namespace:qualifier` table name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    namespace: String,
    qualifier: String,
}

impl TableName {
    /// Parse `qualifier` or `namespace:qualifier`.
    pub fn new(name: impl AsRef<str>) -> TableResult<Self> {
        let name = name.as_ref();
        let (namespace, qualifier) = match name.split_once(':') {
            Some((ns, q)) => (ns, q),
            None => (DEFAULT_NAMESPACE, name),
        };
        if !NAMESPACE_RE.is_match(namespace) {
            return Err(invalid(name, "namespace must match [A-Za-z0-9_]+"));
        }
        if qualifier.is_empty() {
            return Err(invalid(name, "qualifier must not be empty"));
        }
        if !QUALIFIER_RE.is_match(qualifier) {
            return Err(invalid(
                name,
                "qualifier must start with [A-Za-z0-9_] and contain only [A-Za-z0-9_.-]",
            ));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            qualifier: qualifier.to_string(),
        })
    }

    /// Namespace component.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualifier component.
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
}

fn invalid(name: &str, reason: &'static str) -> TableError {
    TableError::InvalidTableName {
        name: name.to_string(),
        reason,
    }
}

impl FromStr for TableName {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == DEFAULT_NAMESPACE {
            f.write_str(&self.qualifier)
        } else {
            write!(f, "{}:{}", self.namespace, self.qualifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_uses_default_namespace() {
        let name = TableName::new("async").unwrap();
        assert_eq!(name.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(name.qualifier(), "async");
        assert_eq!(name.to_string(), "async");
    }

    #[test]
    fn qualified_name_round_trips_display() {
        let name: TableName = "metrics:cpu.load-1m".parse().unwrap();
        assert_eq!(name.namespace(), "metrics");
        assert_eq!(name.to_string(), "metrics:cpu.load-1m");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "ns:", ":t", "-lead", "has space", "a:b:c", "ns-x:t"] {
            let err = TableName::new(bad).unwrap_err();
            assert!(
                matches!(err, TableError::InvalidTableName { .. }),
                "{bad:?} should be rejected"
            );
        }
    }
}
