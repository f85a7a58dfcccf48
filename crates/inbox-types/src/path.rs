use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path '{value}': expected /<domain>/<identifier>")]
    Malformed { value: String },
    #[error("invalid path '{value}': unknown domain '{domain}'")]
    UnknownDomain { value: String, domain: String },
}

/// User-addressable storage domains. The inbox area is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathDomain {
    Storage,
    Public,
    Private,
}

impl PathDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathDomain::Storage => "storage",
            PathDomain::Public => "public",
            PathDomain::Private => "private",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "storage" => Some(PathDomain::Storage),
            "public" => Some(PathDomain::Public),
            "private" => Some(PathDomain::Private),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    pub domain: PathDomain,
    pub identifier: String,
}

impl Path {
    pub fn new(domain: PathDomain, identifier: impl Into<String>) -> Self {
        Self {
            domain,
            identifier: identifier.into(),
        }
    }

    pub fn storage(identifier: impl Into<String>) -> Self {
        Self::new(PathDomain::Storage, identifier)
    }

    pub fn public(identifier: impl Into<String>) -> Self {
        Self::new(PathDomain::Public, identifier)
    }

    pub fn private(identifier: impl Into<String>) -> Self {
        Self::new(PathDomain::Private, identifier)
    }

    pub fn parse(s: &str) -> Result<Self, PathError> {
        let malformed = || PathError::Malformed {
            value: s.to_string(),
        };
        let rest = s.strip_prefix('/').ok_or_else(malformed)?;
        let (domain, identifier) = rest.split_once('/').ok_or_else(malformed)?;
        if identifier.is_empty() || identifier.contains('/') {
            return Err(malformed());
        }
        let domain = PathDomain::parse(domain).ok_or_else(|| PathError::UnknownDomain {
            value: s.to_string(),
            domain: domain.to_string(),
        })?;
        Ok(Path::new(domain, identifier))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.domain.as_str(), self.identifier)
    }
}

impl FromStr for Path {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Path::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_domain() {
        assert_eq!(Path::parse("/storage/foo").unwrap(), Path::storage("foo"));
        assert_eq!(Path::parse("/public/foo").unwrap(), Path::public("foo"));
        assert_eq!(Path::parse("/private/foo").unwrap(), Path::private("foo"));
        assert_eq!(Path::public("bar").to_string(), "/public/bar");
    }

    #[test]
    fn inbox_is_not_a_path_domain() {
        assert!(matches!(
            Path::parse("/inbox/foo"),
            Err(PathError::UnknownDomain { .. })
        ));
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["storage/foo", "/storage/", "/storage", "/storage/a/b"] {
            assert!(
                matches!(Path::parse(bad), Err(PathError::Malformed { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
