//! WFS / Filter Encoding version handling.

use std::fmt;

/// Namespace prefix used for filter tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `http://www.opengis.net/ogc`, Filter Encoding 1.x
    Ogc,
    /// `http://www.opengis.net/fes/2.0`
    Fes,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Ogc => "ogc",
            Namespace::Fes => "fes",
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Ogc => "http://www.opengis.net/ogc",
            Namespace::Fes => "http://www.opengis.net/fes/2.0",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A normalized WFS version.
///
/// `"1.0"` and `"1.1"` are shorthands for `1.0.0` and `1.1.0`. Anything that
/// is not a 1.x version is encoded with the 2.0 grammar and keeps its
/// original label in the `version` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WfsVersion {
    V1_0_0,
    V1_1_0,
    #[default]
    V2_0,
    Other(String),
}

impl WfsVersion {
    pub const DEFAULT_LABEL: &'static str = "2.0";

    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("2.0") => WfsVersion::V2_0,
            Some("1.0") | Some("1.0.0") => WfsVersion::V1_0_0,
            Some("1.1") | Some("1.1.0") => WfsVersion::V1_1_0,
            Some(other) => WfsVersion::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WfsVersion::V1_0_0 => "1.0.0",
            WfsVersion::V1_1_0 => "1.1.0",
            WfsVersion::V2_0 => "2.0",
            WfsVersion::Other(label) => label,
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            WfsVersion::V1_0_0 | WfsVersion::V1_1_0 => Namespace::Ogc,
            WfsVersion::V2_0 | WfsVersion::Other(_) => Namespace::Fes,
        }
    }

    /// GML 2 encodings: `gml:coord`, `gml:coordinates`, `outerBoundaryIs`.
    pub fn uses_gml2(&self) -> bool {
        matches!(self, WfsVersion::V1_0_0)
    }

    /// GML 3.2 encodings: `MultiSurface` instead of `MultiPolygon`.
    pub fn uses_gml32(&self) -> bool {
        self.namespace() == Namespace::Fes
    }

    pub fn gml_uri(&self) -> &'static str {
        if self.uses_gml32() {
            "http://www.opengis.net/gml/3.2"
        } else {
            "http://www.opengis.net/gml"
        }
    }
}

impl fmt::Display for WfsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthands_normalize() {
        assert_eq!(WfsVersion::normalize(Some("1.0")), WfsVersion::V1_0_0);
        assert_eq!(WfsVersion::normalize(Some("1.1")), WfsVersion::V1_1_0);
        assert_eq!(WfsVersion::normalize(Some("1.1.0")), WfsVersion::V1_1_0);
        assert_eq!(WfsVersion::normalize(None), WfsVersion::V2_0);
        assert_eq!(WfsVersion::normalize(Some("2.0")), WfsVersion::V2_0);
    }

    #[test]
    fn test_other_versions_pass_through() {
        let version = WfsVersion::normalize(Some("2.0.2"));
        assert_eq!(version.as_str(), "2.0.2");
        assert_eq!(version.namespace(), Namespace::Fes);
    }

    #[test]
    fn test_namespace_by_version() {
        assert_eq!(WfsVersion::V1_0_0.namespace().prefix(), "ogc");
        assert_eq!(WfsVersion::V1_1_0.namespace().prefix(), "ogc");
        assert_eq!(WfsVersion::V2_0.namespace().prefix(), "fes");
        assert!(WfsVersion::V1_0_0.uses_gml2());
        assert!(!WfsVersion::V1_1_0.uses_gml32());
    }
}
