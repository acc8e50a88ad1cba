//! CQL writer (GeoServer dialect).
//!
//! Fragments are combined as `(frag1) AND (frag2) ...`; simple fields are
//! each parenthesized and AND-ed, so one list field encodes as
//! `((attr IN('a')))`.

use crate::descriptor::{
    CrossLayerFilter, Geometry, GroupField, GroupLogic, SimpleFilterField, SpatialField,
    SpatialOperation,
};
use crate::geometry::{ordinate, Shape};
use crate::group_tree::GroupTree;
use crate::predicate::{Condition, FieldPredicate, Literal};
use crate::LOG_TARGET;

/// A group's fields and child groups joined by its logic, or `None` when
/// nothing inside it renders.
pub fn group(tree: &GroupTree<'_>, group_field: &GroupField) -> Option<String> {
    let mut parts: Vec<String> = tree
        .fields(group_field)
        .iter()
        .filter_map(|field| FieldPredicate::from_field(field))
        .filter_map(|predicate| {
            let condition = predicate.lower()?;
            condition_text(predicate.attribute, &condition)
        })
        .collect();
    for child in tree.children(group_field) {
        if let Some(sub) = group(tree, child) {
            parts.push(format!("({})", sub));
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(match group_field.logic {
        GroupLogic::AndNot => format!("NOT ({})", parts.join(" AND ")),
        logic => parts.join(&format!(" {} ", logic.keyword())),
    })
}

/// Simple fields, each parenthesized and AND-ed; `INCLUDE` when none renders.
pub fn simple_fields(fields: &[SimpleFilterField]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .filter_map(FieldPredicate::from_simple)
        .filter_map(|predicate| {
            let condition = predicate.lower()?;
            condition_text(predicate.attribute, &condition)
        })
        .map(|text| format!("({})", text))
        .collect();
    if parts.is_empty() {
        "INCLUDE".to_string()
    } else {
        parts.join(" AND ")
    }
}

pub fn condition_text(attribute: &str, condition: &Condition) -> Option<String> {
    match condition {
        Condition::Compare { op, literal } => {
            Some(format!("{}{}{}", attribute, op.symbol(), quote(literal)))
        }
        Condition::Between { lower, upper } => Some(format!(
            "({0}>={1} AND {0}<={2})",
            attribute,
            quote(lower),
            quote(upper)
        )),
        Condition::Like { value, match_case } => {
            if *match_case {
                Some(format!("{} LIKE '%{}%'", attribute, like_pattern(value)))
            } else {
                Some(format!(
                    "strToLowerCase({}) LIKE '%{}%'",
                    attribute,
                    like_pattern(&value.to_lowercase())
                ))
            }
        }
        Condition::IsNull => Some(is_null(attribute)),
        Condition::OneOf {
            values,
            include_null,
        } => {
            let list = (!values.is_empty()).then(|| {
                let items: Vec<_> = values.iter().map(quote).collect();
                format!("{} IN({})", attribute, items.join(","))
            });
            match (list, include_null) {
                (Some(list), true) => Some(format!("({} OR {})", is_null(attribute), list)),
                (Some(list), false) => Some(list),
                (None, true) => Some(is_null(attribute)),
                (None, false) => None,
            }
        }
        Condition::AnyOf(conditions) => {
            let parts: Vec<_> = conditions
                .iter()
                .filter_map(|condition| condition_text(attribute, condition))
                .collect();
            match parts.len() {
                0 => None,
                1 => parts.into_iter().next(),
                _ => Some(format!("({})", parts.join(" OR "))),
            }
        }
    }
}

/// `OPERATION(attribute, GEOMETRY)`, `BBOX(attribute, minx, miny, maxx, maxy)`
/// or `DWITHIN(attribute, GEOMETRY, distance, meters)`.
pub fn spatial(field: &SpatialField, operation: SpatialOperation, geometry: &Geometry) -> Option<String> {
    match operation {
        SpatialOperation::Unsupported => None,
        SpatialOperation::Bbox => {
            let Some([minx, miny, maxx, maxy, ..]) = geometry.extent.as_deref() else {
                tracing::warn!(target: LOG_TARGET, "BBOX without a complete extent dropped");
                return None;
            };
            let srs = geometry
                .projection
                .as_deref()
                .map(|srs| format!(", '{}'", escape_quotes(srs)))
                .unwrap_or_default();
            Some(format!(
                "BBOX({}, {}, {}, {}, {}{})",
                field.attribute,
                ordinate(*minx),
                ordinate(*miny),
                ordinate(*maxx),
                ordinate(*maxy),
                srs
            ))
        }
        SpatialOperation::DWithin => {
            let shape = Shape::from_geometry(geometry)?;
            Some(format!(
                "DWITHIN({}, {}, {}, meters)",
                field.attribute,
                shape.to_wkt(),
                ordinate(geometry.distance.unwrap_or(0.0))
            ))
        }
        op => {
            let shape = Shape::from_geometry(geometry)?;
            Some(format!("{}({}, {})", op.keyword(), field.attribute, shape.to_wkt()))
        }
    }
}

/// `OPERATION(attribute, collectGeometries(queryCollection('type','geom','cql')))`.
pub fn cross_layer(filter: &CrossLayerFilter) -> Option<String> {
    let query = match filter.query_collection() {
        Ok(query) => query,
        Err(reason) => {
            tracing::warn!(target: LOG_TARGET, attribute = %filter.attribute, "{}", reason);
            return None;
        }
    };
    let geometries = format!(
        "collectGeometries(queryCollection('{}','{}','{}'))",
        escape_quotes(&query.type_name),
        escape_quotes(&query.geometry_name),
        escape_quotes(query.cql_filter.as_deref().unwrap_or("INCLUDE"))
    );
    let distance = if filter.operation == SpatialOperation::DWithin {
        format!(", {}, meters", ordinate(filter.distance.unwrap_or(0.0)))
    } else {
        String::new()
    };
    Some(format!(
        "{}({}, {}{})",
        filter.operation.keyword(),
        filter.attribute,
        geometries,
        distance
    ))
}

/// `(frag1) AND (frag2) ...`; `None` when there is nothing to combine.
pub fn combine(fragments: &[String]) -> Option<String> {
    if fragments.is_empty() {
        return None;
    }
    Some(format!("({})", fragments.join(") AND (")))
}

fn is_null(attribute: &str) -> String {
    format!("isNull({})=true", attribute)
}

fn quote(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => n.clone(),
        Literal::Text(s) | Literal::Date(s) => format!("'{}'", escape_quotes(s)),
    }
}

fn escape_quotes(text: &str) -> String {
    text.replace('\'', "''")
}

/// Escapes the `LIKE` wildcards `%` and `_` (and the escape character
/// itself) so a user value matches literally.
fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '\'' => out.push_str("''"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FilterField, GroupField, Operator};
    use serde_json::json;

    fn text(s: &str) -> Literal {
        Literal::Text(s.to_string())
    }

    #[test]
    fn test_compare_quotes_text_not_numbers() {
        let eq = Condition::Compare {
            op: Operator::Eq,
            literal: text("O'Hare"),
        };
        assert_eq!(condition_text("NAME", &eq).unwrap(), "NAME='O''Hare'");

        let gte = Condition::Compare {
            op: Operator::Gte,
            literal: Literal::Number("10".to_string()),
        };
        assert_eq!(condition_text("PERSONS", &gte).unwrap(), "PERSONS>=10");
    }

    #[test]
    fn test_between_and_like() {
        let between = Condition::Between {
            lower: Literal::Date("2016-01-01T00:00:00.000Z".to_string()),
            upper: Literal::Date("2016-12-31T00:00:00.000Z".to_string()),
        };
        assert_eq!(
            condition_text("DATE", &between).unwrap(),
            "(DATE>='2016-01-01T00:00:00.000Z' AND DATE<='2016-12-31T00:00:00.000Z')"
        );

        let ilike = Condition::Like {
            value: "IdA".to_string(),
            match_case: false,
        };
        assert_eq!(
            condition_text("NAME", &ilike).unwrap(),
            "strToLowerCase(NAME) LIKE '%ida%'"
        );
        let like = Condition::Like {
            value: "IdA".to_string(),
            match_case: true,
        };
        assert_eq!(condition_text("NAME", &like).unwrap(), "NAME LIKE '%IdA%'");
    }

    #[test]
    fn test_one_of_variants() {
        let only_values = Condition::OneOf {
            values: vec![text("state"), text("local")],
            include_null: false,
        };
        assert_eq!(
            condition_text("hs", &only_values).unwrap(),
            "hs IN('state','local')"
        );

        let with_null = Condition::OneOf {
            values: vec![text("state")],
            include_null: true,
        };
        assert_eq!(
            condition_text("hs", &with_null).unwrap(),
            "(isNull(hs)=true OR hs IN('state'))"
        );

        let empty = Condition::OneOf {
            values: vec![],
            include_null: false,
        };
        assert_eq!(condition_text("hs", &empty), None);
    }

    #[test]
    fn test_simple_list_field() {
        let fields: Vec<SimpleFilterField> = serde_json::from_value(json!([{
            "attribute": "highway_system", "type": "list", "operator": "=",
            "values": ["state"], "optionsValues": ["local", "state"]
        }]))
        .unwrap();
        let fragment = simple_fields(&fields);
        assert_eq!(fragment, "(highway_system IN('state'))");
        assert_eq!(
            combine(&[fragment]).unwrap(),
            "((highway_system IN('state')))"
        );
    }

    #[test]
    fn test_simple_fields_without_predicates_include_all() {
        let fields: Vec<SimpleFilterField> = serde_json::from_value(json!([{
            "attribute": "POP", "type": "number", "operator": "><", "values": {}
        }]))
        .unwrap();
        assert_eq!(simple_fields(&fields), "INCLUDE");
    }

    #[test]
    fn test_group_tree_rendering() {
        let groups: Vec<GroupField> = serde_json::from_value(json!([
            {"id": 1, "logic": "OR"},
            {"id": 2, "logic": "AND", "groupId": 1},
            {"id": 3, "logic": "AND NOT", "groupId": 1}
        ]))
        .unwrap();
        let fields: Vec<FilterField> = serde_json::from_value(json!([
            {"attribute": "A", "operator": "=", "type": "string", "value": "x", "groupId": 1},
            {"attribute": "B", "operator": ">", "type": "number", "value": 3, "groupId": 2},
            {"attribute": "C", "operator": "<", "type": "number", "value": 9, "groupId": 2},
            {"attribute": "D", "operator": "isNull", "type": "string", "groupId": 3}
        ]))
        .unwrap();
        let tree = GroupTree::build(&groups, &fields).unwrap();
        let cql = group(&tree, tree.root().unwrap()).unwrap();
        assert_eq!(cql, "A='x' OR (B>3 AND C<9) OR (NOT (isNull(D)=true))");
    }

    #[test]
    fn test_spatial_variants() {
        let field: SpatialField = serde_json::from_value(json!({
            "attribute": "the_geom", "operation": "INTERSECTS",
            "geometry": {"type": "Polygon", "projection": "EPSG:4326",
                         "extent": [0, 0, 1, 1],
                         "coordinates": [[[0, 0], [0, 1], [1, 1], [0, 0]]], "distance": 25}
        }))
        .unwrap();
        let geometry = field.geometry.clone().unwrap();

        assert_eq!(
            spatial(&field, SpatialOperation::Intersects, &geometry).unwrap(),
            "INTERSECTS(the_geom, POLYGON((0 0, 0 1, 1 1, 0 0)))"
        );
        assert_eq!(
            spatial(&field, SpatialOperation::Bbox, &geometry).unwrap(),
            "BBOX(the_geom, 0, 0, 1, 1, 'EPSG:4326')"
        );
        assert_eq!(
            spatial(&field, SpatialOperation::DWithin, &geometry).unwrap(),
            "DWITHIN(the_geom, POLYGON((0 0, 0 1, 1 1, 0 0)), 25, meters)"
        );
        assert_eq!(spatial(&field, SpatialOperation::Unsupported, &geometry), None);
    }

    #[test]
    fn test_cross_layer() {
        let filter: CrossLayerFilter = serde_json::from_value(json!({
            "operation": "INTERSECTS", "attribute": "the_geom",
            "collectGeometries": {"queryCollection": {
                "typeName": "topp:states", "geometryName": "the_geom", "cqlFilter": "STATE_NAME='Ohio'"}}
        }))
        .unwrap();
        assert_eq!(
            cross_layer(&filter).unwrap(),
            "INTERSECTS(the_geom, collectGeometries(queryCollection('topp:states','the_geom','STATE_NAME=''Ohio''')))"
        );
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(&[]), None);
        assert_eq!(
            combine(&["a=1".to_string(), "b=2".to_string()]).unwrap(),
            "(a=1) AND (b=2)"
        );
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let like = Condition::Like {
            value: "100%_a\\b's".to_string(),
            match_case: true,
        };
        assert_eq!(
            condition_text("CODE", &like).unwrap(),
            "CODE LIKE '%100\\%\\_a\\\\b''s%'"
        );
    }

    #[test]
    fn test_cross_layer_without_geometry_operand_is_dropped() {
        let bbox: CrossLayerFilter = serde_json::from_value(json!({
            "operation": "BBOX", "attribute": "g",
            "collectGeometries": {"queryCollection": {"typeName": "t", "geometryName": "g"}}
        }))
        .unwrap();
        assert_eq!(cross_layer(&bbox), None);

        let no_collection: CrossLayerFilter =
            serde_json::from_value(json!({"operation": "WITHIN", "attribute": "g"})).unwrap();
        assert_eq!(cross_layer(&no_collection), None);
    }
}
