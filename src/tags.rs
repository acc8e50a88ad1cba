//! Qualified tag names for filter operators.
//!
//! Every encode call resolves its own [`TagTable`] for the namespace of the
//! requested version. Tables are built fresh and never mutated, so calls for
//! different versions cannot observe each other's prefixes.

use crate::descriptor::{GroupLogic, Operator, SpatialOperation};
use crate::version::Namespace;
use crate::xml::escape_text;
use std::collections::HashMap;

const COMPARISON_TAGS: &[(Operator, &str)] = &[
    (Operator::Eq, "PropertyIsEqualTo"),
    (Operator::NotEq, "PropertyIsNotEqualTo"),
    (Operator::Lt, "PropertyIsLessThan"),
    (Operator::Gt, "PropertyIsGreaterThan"),
    (Operator::Lte, "PropertyIsLessThanOrEqualTo"),
    (Operator::Gte, "PropertyIsGreaterThanOrEqualTo"),
    (Operator::Between, "PropertyIsBetween"),
    (Operator::Like, "PropertyIsLike"),
    (Operator::ILike, "PropertyIsLike"),
    (Operator::IsNull, "PropertyIsNull"),
];

const SPATIAL_TAGS: &[(SpatialOperation, &str)] = &[
    (SpatialOperation::Intersects, "Intersects"),
    (SpatialOperation::Bbox, "BBOX"),
    (SpatialOperation::Contains, "Contains"),
    (SpatialOperation::DWithin, "DWithin"),
    (SpatialOperation::Within, "Within"),
];

/// Operator tags resolved for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTable {
    namespace: Namespace,
    comparison: HashMap<Operator, String>,
    /// `And`, `Or`, `Not`
    logical: [String; 3],
    spatial: HashMap<SpatialOperation, String>,
    property: String,
}

impl TagTable {
    pub fn resolve(namespace: Namespace) -> Self {
        let prefix = namespace.prefix();
        let qualify = |local: &str| format!("{}:{}", prefix, local);
        Self {
            namespace,
            comparison: COMPARISON_TAGS
                .iter()
                .map(|(op, local)| (*op, qualify(local)))
                .collect(),
            logical: [qualify("And"), qualify("Or"), qualify("Not")],
            spatial: SPATIAL_TAGS
                .iter()
                .map(|(op, local)| (*op, qualify(local)))
                .collect(),
            property: qualify(match namespace {
                Namespace::Ogc => "PropertyName",
                Namespace::Fes => "ValueReference",
            }),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn comparison(&self, op: Operator) -> Option<&str> {
        self.comparison.get(&op).map(String::as_str)
    }

    pub fn logical(&self, logic: GroupLogic) -> &str {
        let slot = match logic {
            GroupLogic::And => 0,
            GroupLogic::Or => 1,
            GroupLogic::AndNot => 2,
        };
        &self.logical[slot]
    }

    pub fn spatial(&self, op: SpatialOperation) -> Option<&str> {
        self.spatial.get(&op).map(String::as_str)
    }

    /// Qualifies any other filter element, e.g. `Literal` -> `fes:Literal`.
    pub fn element(&self, local: &str) -> String {
        format!("{}:{}", self.namespace.prefix(), local)
    }

    /// `<ogc:PropertyName>name</ogc:PropertyName>` or the `fes:ValueReference`
    /// equivalent.
    pub fn property(&self, name: &str) -> String {
        format!("<{0}>{1}</{0}>", self.property, escape_text(name))
    }

    /// `<ogc:Literal>value</ogc:Literal>`, escaping the value.
    pub fn literal(&self, value: &str) -> String {
        self.wrap("Literal", &escape_text(value))
    }

    /// Wraps already-encoded content in a namespaced element.
    pub fn wrap(&self, local: &str, inner: &str) -> String {
        let name = self.element(local);
        format!("<{0}>{1}</{0}>", name, inner)
    }
}

/// Wraps content in an element with an already-qualified name.
pub fn wrap_qualified(name: &str, inner: &str) -> String {
    format!("<{0}>{1}</{0}>", name, inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ogc() {
        let tags = TagTable::resolve(Namespace::Ogc);
        assert_eq!(tags.comparison(Operator::Eq), Some("ogc:PropertyIsEqualTo"));
        assert_eq!(tags.logical(GroupLogic::AndNot), "ogc:Not");
        assert_eq!(tags.spatial(SpatialOperation::DWithin), Some("ogc:DWithin"));
        assert_eq!(tags.property("NAME"), "<ogc:PropertyName>NAME</ogc:PropertyName>");
    }

    #[test]
    fn test_resolve_fes() {
        let tags = TagTable::resolve(Namespace::Fes);
        assert_eq!(tags.comparison(Operator::ILike), Some("fes:PropertyIsLike"));
        assert_eq!(tags.property("NAME"), "<fes:ValueReference>NAME</fes:ValueReference>");
        assert_eq!(tags.literal("a&b"), "<fes:Literal>a&amp;b</fes:Literal>");
    }

    #[test]
    fn test_tables_are_independent() {
        let fes = TagTable::resolve(Namespace::Fes);
        let ogc = TagTable::resolve(Namespace::Ogc);
        let fes_again = TagTable::resolve(Namespace::Fes);
        assert_eq!(fes, fes_again);
        assert_ne!(fes, ogc);
    }

    #[test]
    fn test_unsupported_operators_have_no_tag() {
        let tags = TagTable::resolve(Namespace::Ogc);
        assert_eq!(tags.comparison(Operator::Unsupported), None);
        assert_eq!(tags.spatial(SpatialOperation::Unsupported), None);
    }
}
