use {
    anyhow::{Result, bail},
    serde::{Deserialize, Serialize, de::Error},
    std::{fmt, str::FromStr},
};

/// One decoded component of a request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub name: String,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self { name })
    }
}

/// Path of a requested file or folder relative to the root folder.
///
/// Parsed from the already decoded form (`/docs/my files/report.pdf`), as
/// taken from a query string. Names are used as is: a `%` in a name is a
/// literal `%`. The root folder itself has no segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestPath(Vec<PathSegment>);

impl RequestPath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.0.last().map(|segment| segment.name.as_str())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("path segment cannot be empty");
    }
    if name.contains('/') {
        bail!("path segment cannot contain '/'");
    }
    Ok(())
}

impl FromStr for RequestPath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(path) = s.strip_prefix('/') else {
            bail!("path must start with '/'");
        };
        let path = path.strip_suffix('/').unwrap_or(path);
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.contains("//") {
            bail!("path cannot contain '//'");
        }
        path.split('/')
            .map(PathSegment::new)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment.name)?;
        }
        Ok(())
    }
}

impl Serialize for RequestPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RequestPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
