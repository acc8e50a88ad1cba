//! Data model of a filter descriptor, as built by query forms and sent as JSON.
//!
//! The field names follow the camelCase JSON the callers produce
//! (`filterFields`, `groupFields`, `spatialField`, ...). Unknown keys are
//! ignored so descriptors carrying UI state decode unchanged.

use crate::error::EncodeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// The root of a filter request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterDescriptor {
    /// Attribute predicates attached to groups
    #[serde(deserialize_with = "null_as_default")]
    pub filter_fields: Vec<FilterField>,
    /// Logical groups forming a tree through `groupId`
    #[serde(deserialize_with = "null_as_default")]
    pub group_fields: Vec<GroupField>,
    /// Flat, multi-valued attribute predicates used without a group tree
    #[serde(deserialize_with = "null_as_default")]
    pub simple_filter_fields: Vec<SimpleFilterField>,
    pub spatial_field: Option<SpatialField>,
    pub cross_layer_filter: Option<CrossLayerFilters>,
    pub pagination: Option<Pagination>,
    pub sort_options: Option<SortOptions>,
    /// Ask the server for a feature count only
    pub hits: bool,
}

/// An attribute predicate owned by a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    pub attribute: String,
    pub operator: Operator,
    /// Shape depends on `field_type`: `{startDate, endDate}` for dates,
    /// a number or `{lowBound, upBound}` for numbers, a scalar otherwise.
    #[serde(default, alias = "values")]
    pub value: Value,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// A flat predicate whose `values` may hold several alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleFilterField {
    pub attribute: String,
    pub operator: Operator,
    #[serde(default, alias = "value")]
    pub values: Value,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// A logical node of the group tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupField {
    pub id: GroupId,
    pub logic: GroupLogic,
    /// Parent group, absent for roots
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// Group identifier. Forms emit both numbers and strings, so both decode
/// to the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        GroupId(id.to_string())
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        GroupId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => GroupId(text),
            RawId::Number(number) => GroupId(number.to_string()),
        })
    }
}

/// Comparison operators a field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "><")]
    Between,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "isNull")]
    IsNull,
    #[serde(other)]
    Unsupported,
}

impl Operator {
    /// The operator as written in the descriptor and in CQL comparisons.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Between => "><",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::IsNull => "isNull",
            Operator::Unsupported => "?",
        }
    }

    /// Plain binary comparisons that take a single literal.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Gt
                | Operator::Lt
                | Operator::Gte
                | Operator::Lte
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Date,
    Number,
    String,
    List,
    #[serde(other)]
    Unsupported,
}

/// Logic joining the members of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupLogic {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "AND NOT")]
    AndNot,
}

impl GroupLogic {
    pub fn keyword(self) -> &'static str {
        match self {
            GroupLogic::And => "AND",
            GroupLogic::Or => "OR",
            GroupLogic::AndNot => "AND NOT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialField {
    pub attribute: String,
    #[serde(default)]
    pub operation: Option<SpatialOperation>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpatialOperation {
    Intersects,
    Bbox,
    Contains,
    #[serde(rename = "DWITHIN")]
    DWithin,
    Within,
    #[serde(other)]
    Unsupported,
}

impl SpatialOperation {
    /// The operation name used by CQL.
    pub fn keyword(self) -> &'static str {
        match self {
            SpatialOperation::Intersects => "INTERSECTS",
            SpatialOperation::Bbox => "BBOX",
            SpatialOperation::Contains => "CONTAINS",
            SpatialOperation::DWithin => "DWITHIN",
            SpatialOperation::Within => "WITHIN",
            SpatialOperation::Unsupported => "?",
        }
    }
}

/// GeoJSON-like geometry as drawn on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    #[serde(default)]
    pub coordinates: Value,
    /// SRS of the coordinates, e.g. `EPSG:4326`
    #[serde(default)]
    pub projection: Option<String>,
    /// `[minx, miny, maxx, maxy]`, used by BBOX
    #[serde(default)]
    pub extent: Option<Vec<f64>>,
    /// Distance in meters, used by DWITHIN
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    Polygon,
    MultiPolygon,
    #[serde(other)]
    Unsupported,
}

/// One cross-layer filter or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CrossLayerFilters {
    Many(Vec<CrossLayerFilter>),
    One(CrossLayerFilter),
}

impl CrossLayerFilters {
    pub fn as_slice(&self) -> &[CrossLayerFilter] {
        match self {
            CrossLayerFilters::Many(filters) => filters,
            CrossLayerFilters::One(filter) => std::slice::from_ref(filter),
        }
    }
}

/// A spatial predicate whose geometry is collected server side from another
/// feature type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossLayerFilter {
    pub operation: SpatialOperation,
    pub attribute: String,
    #[serde(default)]
    pub collect_geometries: Option<CollectGeometries>,
    #[serde(default)]
    pub distance: Option<f64>,
}

impl CrossLayerFilter {
    /// The layer query to collect geometries from, or why the filter cannot
    /// be encoded: BBOX has no function form and the query is required.
    pub fn query_collection(&self) -> Result<&QueryCollection, &'static str> {
        match self.operation {
            SpatialOperation::Unsupported | SpatialOperation::Bbox => {
                Err("cross-layer filter with unsupported operation dropped")
            }
            _ => self
                .collect_geometries
                .as_ref()
                .map(|collect| &collect.query_collection)
                .ok_or("cross-layer filter without collectGeometries dropped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectGeometries {
    pub query_collection: QueryCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCollection {
    pub type_name: String,
    pub geometry_name: String,
    #[serde(default)]
    pub cql_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub start_index: Option<u64>,
    pub max_features: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortOptions {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl SortOptions {
    pub fn new(sort_by: &str, sort_order: &str) -> Self {
        Self {
            sort_by: Some(sort_by.to_string()),
            sort_order: Some(sort_order.to_string()),
        }
    }

    /// Both the property and the direction, when both are set.
    pub fn resolved(&self) -> Option<(&str, &str)> {
        match (self.sort_by.as_deref(), self.sort_order.as_deref()) {
            (Some(by), Some(order)) if !by.is_empty() && !order.is_empty() => Some((by, order)),
            _ => None,
        }
    }
}

impl FilterDescriptor {
    /// Decodes a descriptor from JSON text.
    pub fn from_json(json: &str) -> Result<Self, EncodeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The spatial field, when it has both an operation and a geometry.
    pub fn spatial(&self) -> Option<(&SpatialField, SpatialOperation, &Geometry)> {
        let field = self.spatial_field.as_ref()?;
        Some((field, field.operation?, field.geometry.as_ref()?))
    }

    pub fn cross_layer_filters(&self) -> &[CrossLayerFilter] {
        self.cross_layer_filter
            .as_ref()
            .map(CrossLayerFilters::as_slice)
            .unwrap_or(&[])
    }

    /// True when at least one predicate source is populated.
    pub fn has_predicates(&self) -> bool {
        !self.filter_fields.is_empty()
            || !self.simple_filter_fields.is_empty()
            || self.spatial().is_some()
            || !self.cross_layer_filters().is_empty()
    }
}

impl FromStr for FilterDescriptor {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

/// A filter handed to the encoder, either decoded already or as JSON text.
#[derive(Debug, Clone, Copy)]
pub enum FilterInput<'a> {
    Descriptor(&'a FilterDescriptor),
    Json(&'a str),
}

impl<'a> FilterInput<'a> {
    pub fn resolve(self) -> Result<Cow<'a, FilterDescriptor>, EncodeError> {
        match self {
            FilterInput::Descriptor(descriptor) => Ok(Cow::Borrowed(descriptor)),
            FilterInput::Json(json) => FilterDescriptor::from_json(json).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a FilterDescriptor> for FilterInput<'a> {
    fn from(descriptor: &'a FilterDescriptor) -> Self {
        FilterInput::Descriptor(descriptor)
    }
}

impl<'a> From<&'a str> for FilterInput<'a> {
    fn from(json: &'a str) -> Self {
        FilterInput::Json(json)
    }
}

impl<'a> From<&'a String> for FilterInput<'a> {
    fn from(json: &'a String) -> Self {
        FilterInput::Json(json.as_str())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_grouped_descriptor() {
        let descriptor = FilterDescriptor::from_json(
            r#"{
                "filterFields": [{"attribute": "STATE_NAME", "operator": "=", "type": "string",
                                  "value": "Idaho", "groupId": 1, "rowId": 42}],
                "groupFields": [{"id": 1, "logic": "OR", "index": 0}],
                "spatialField": null
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.filter_fields.len(), 1);
        let field = &descriptor.filter_fields[0];
        assert_eq!(field.operator, Operator::Eq);
        assert_eq!(field.field_type, FieldType::String);
        assert_eq!(field.value, json!("Idaho"));
        assert_eq!(field.group_id, Some(GroupId::from(1)));
        assert_eq!(descriptor.group_fields[0].logic, GroupLogic::Or);
        assert!(descriptor.spatial().is_none());
        assert!(descriptor.has_predicates());
    }

    #[test]
    fn test_group_id_accepts_text_and_numbers() {
        let from_text: GroupId = serde_json::from_value(json!("1")).unwrap();
        let from_number: GroupId = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(from_text, from_number);
    }

    #[test]
    fn test_values_alias_and_unknown_operator() {
        let field: FilterField = serde_json::from_value(json!({
            "attribute": "POP", "operator": "~=", "type": "number",
            "values": {"lowBound": 3}
        }))
        .unwrap();
        assert_eq!(field.operator, Operator::Unsupported);
        assert_eq!(field.value, json!({"lowBound": 3}));
        assert_eq!(field.group_id, None);
    }

    #[test]
    fn test_cross_layer_one_or_many() {
        let one: FilterDescriptor = serde_json::from_value(json!({
            "crossLayerFilter": {
                "operation": "INTERSECTS", "attribute": "the_geom",
                "collectGeometries": {"queryCollection": {
                    "typeName": "topp:states", "geometryName": "the_geom", "cqlFilter": "STATE_NAME='Ohio'"}}
            }
        }))
        .unwrap();
        assert_eq!(one.cross_layer_filters().len(), 1);

        let many: FilterDescriptor = serde_json::from_value(json!({
            "crossLayerFilter": [
                {"operation": "WITHIN", "attribute": "a"},
                {"operation": "DWITHIN", "attribute": "b", "distance": 5.0}
            ]
        }))
        .unwrap();
        assert_eq!(many.cross_layer_filters().len(), 2);
        assert_eq!(many.cross_layer_filters()[1].operation, SpatialOperation::DWithin);
    }

    #[test]
    fn test_null_lists_and_empty_descriptor() {
        let descriptor =
            FilterDescriptor::from_json(r#"{"filterFields": null, "simpleFilterFields": []}"#).unwrap();
        assert!(descriptor.filter_fields.is_empty());
        assert!(!descriptor.has_predicates());
    }

    #[test]
    fn test_spatial_requires_operation_and_geometry() {
        let descriptor: FilterDescriptor = serde_json::from_value(json!({
            "spatialField": {"attribute": "the_geom", "operation": "INTERSECTS"}
        }))
        .unwrap();
        assert!(descriptor.spatial().is_none());
    }

    #[test]
    fn test_sort_options_need_both_parts() {
        assert_eq!(SortOptions::new("NAME", "ASC").resolved(), Some(("NAME", "ASC")));
        let partial = SortOptions {
            sort_by: Some("NAME".to_string()),
            sort_order: None,
        };
        assert_eq!(partial.resolved(), None);
    }

    #[test]
    fn test_input_from_invalid_json() {
        let result = FilterInput::from("{not json").resolve();
        assert!(matches!(result, Err(EncodeError::Parse(_))));
    }
}
