use std::fmt;

use serde::{Deserialize, Serialize};

/// A fully-qualified declaration name, e.g. `app.util.compute`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FqName(String);

impl FqName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Qualify `name` with `package`. An empty package leaves the name as is.
    pub fn qualify(package: &str, name: &str) -> Self {
        if package.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", package, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment.
    pub fn package(&self) -> &str {
        self.0.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }

    /// Whether this name is `filter` itself or nested under it.
    ///
    /// `app.util` matches `app.util` and `app.util.compute`, but not
    /// `app.utility`.
    pub fn matches_filter(&self, filter: &str) -> bool {
        match self.0.strip_prefix(filter) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FqName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(FqName::qualify("app.util", "f").as_str(), "app.util.f");
        assert_eq!(FqName::qualify("", "f").as_str(), "f");
    }

    #[test]
    fn test_segments() {
        let name = FqName::new("app.util.compute");
        assert_eq!(name.short_name(), "compute");
        assert_eq!(name.package(), "app.util");
        assert_eq!(FqName::new("main").package(), "");
    }

    #[test]
    fn test_matches_filter() {
        let name = FqName::new("app.util.compute");
        assert!(name.matches_filter("app.util.compute"));
        assert!(name.matches_filter("app.util"));
        assert!(name.matches_filter("app"));
        assert!(!name.matches_filter("app.uti"));
        assert!(!name.matches_filter("app.util.compute2"));
    }
}
