//! OGC Filter Encoding writer and the WFS request envelopes around it.
//!
//! ## Output layout
//!
//! ```text
//! <wfs:GetFeature ...version-specific attributes and namespaces...>
//!   <wfs:Query typeName(s)="..." srsName="...">
//!     <ns:Filter>
//!       fragment                       (one predicate source)
//!       <ns:And>fragment...</ns:And>   (several sources)
//!     </ns:Filter>
//!     property names, <ns:SortBy>
//!   </wfs:Query>
//! </wfs:GetFeature>
//! ```
//!
//! `ns` is `ogc` for 1.0.0/1.1.0 and `fes` for 2.0. Fragments come from the
//! group tree or the simple fields, the spatial field and each cross-layer
//! filter.
//!
//! ## Version differences
//!
//! | aspect              | 1.0.0                  | 1.1.0              | 2.0                      |
//! |---------------------|------------------------|--------------------|--------------------------|
//! | page size attribute | `maxFeatures`          | `maxFeatures`      | `count`                  |
//! | default format      | `GML2`                 | none               | none                     |
//! | query type name     | `typeName`             | `typeName`         | `typeNames`              |
//! | point               | `gml:coord` X/Y        | `gml:pos`          | `gml:pos`                |
//! | polygon rings       | `outerBoundaryIs` + `gml:coordinates` | `exterior` + `gml:posList` | same as 1.1.0 |
//! | multipolygon        | `MultiPolygon`/`polygonMember` | same as 1.0.0 | `MultiSurface`/`surfaceMembers` |

use crate::descriptor::{
    CrossLayerFilter, Geometry, GroupField, GroupLogic, Operator, Pagination, SimpleFilterField,
    SpatialField, SpatialOperation,
};
use crate::geometry::{join_position, join_ring, ordinate, Position, Ring, Shape};
use crate::group_tree::GroupTree;
use crate::predicate::{Condition, FieldPredicate};
use crate::tags::{wrap_qualified, TagTable};
use crate::version::WfsVersion;
use crate::xml::{cdata, escape_attr, escape_text};
use crate::LOG_TARGET;

const XSI_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Renders filter fragments for one version. Holds the tag table resolved
/// for that version's namespace.
#[derive(Debug, Clone)]
pub struct OgcWriter<'v> {
    version: &'v WfsVersion,
    tags: TagTable,
}

impl<'v> OgcWriter<'v> {
    pub fn new(version: &'v WfsVersion) -> Self {
        Self {
            version,
            tags: TagTable::resolve(version.namespace()),
        }
    }

    pub fn tags(&self) -> &TagTable {
        &self.tags
    }

    /// A group wrapped in its logic tag: own fields first, then every
    /// child group. `None` when nothing inside the group renders. `Not`
    /// takes a single operand, so several members of an `AND NOT` group are
    /// AND-ed inside it.
    pub fn group(&self, tree: &GroupTree<'_>, group: &GroupField) -> Option<String> {
        let mut members: Vec<String> = tree
            .fields(group)
            .iter()
            .filter_map(|field| FieldPredicate::from_field(field))
            .filter_map(|predicate| {
                let condition = predicate.lower()?;
                self.condition(predicate.attribute, &condition)
            })
            .collect();
        members.extend(tree.children(group).filter_map(|child| self.group(tree, child)));
        if members.is_empty() {
            return None;
        }
        let inner = match group.logic {
            GroupLogic::AndNot if members.len() > 1 => self.tags.wrap("And", &members.concat()),
            _ => members.concat(),
        };
        Some(wrap_qualified(self.tags.logical(group.logic), &inner))
    }

    /// Simple fields AND-ed together; a single one is used as is. `None`
    /// when no field renders.
    pub fn simple_fields(&self, fields: &[SimpleFilterField]) -> Option<String> {
        let members: Vec<String> = fields
            .iter()
            .filter_map(FieldPredicate::from_simple)
            .filter_map(|predicate| {
                let condition = predicate.lower()?;
                self.condition(predicate.attribute, &condition)
            })
            .collect();
        self.combine(members)
    }

    /// One attribute condition, or `None` when nothing can be rendered.
    pub fn condition(&self, attribute: &str, condition: &Condition) -> Option<String> {
        let property = self.tags.property(attribute);
        match condition {
            Condition::Compare { op, literal } => {
                let tag = self.tags.comparison(*op)?;
                Some(wrap_qualified(
                    tag,
                    &format!("{}{}", property, self.tags.literal(literal.as_str())),
                ))
            }
            Condition::Between { lower, upper } => {
                let tag = self.tags.comparison(Operator::Between)?;
                let bounds = format!(
                    "{}{}{}",
                    property,
                    self.tags.wrap("LowerBoundary", &self.tags.literal(lower.as_str())),
                    self.tags.wrap("UpperBoundary", &self.tags.literal(upper.as_str())),
                );
                Some(wrap_qualified(tag, &bounds))
            }
            Condition::Like { value, match_case } => {
                let tag = self.tags.element("PropertyIsLike");
                Some(format!(
                    r#"<{0} matchCase="{1}" wildCard="*" singleChar="." escapeChar="!">{2}{3}</{0}>"#,
                    tag,
                    match_case,
                    property,
                    self.tags.literal(&format!("*{}*", escape_like(value))),
                ))
            }
            Condition::IsNull => Some(self.tags.wrap("PropertyIsNull", &property)),
            Condition::OneOf {
                values,
                include_null,
            } => {
                let mut members: Vec<String> = values
                    .iter()
                    .filter_map(|value| {
                        self.condition(
                            attribute,
                            &Condition::Compare {
                                op: Operator::Eq,
                                literal: value.clone(),
                            },
                        )
                    })
                    .collect();
                if *include_null {
                    members.push(self.tags.wrap("PropertyIsNull", &property));
                }
                self.any_of(members)
            }
            Condition::AnyOf(conditions) => self.any_of(
                conditions
                    .iter()
                    .filter_map(|condition| self.condition(attribute, condition))
                    .collect(),
            ),
        }
    }

    fn any_of(&self, mut members: Vec<String>) -> Option<String> {
        match members.len() {
            0 => None,
            1 => members.pop(),
            _ => Some(self.tags.wrap("Or", &members.concat())),
        }
    }

    /// The spatial predicate of the descriptor.
    pub fn spatial(
        &self,
        field: &SpatialField,
        operation: SpatialOperation,
        geometry: &Geometry,
    ) -> Option<String> {
        let tag = self.tags.spatial(operation)?;
        let mut inner = self.tags.property(&field.attribute);
        let srs_name = geometry.projection.as_deref();

        match operation {
            SpatialOperation::Bbox => {
                let extent = match geometry.extent.as_deref() {
                    Some([minx, miny, maxx, maxy, ..]) => [*minx, *miny, *maxx, *maxy],
                    _ => {
                        tracing::warn!(target: LOG_TARGET, "BBOX without a complete extent dropped");
                        return None;
                    }
                };
                inner.push_str(&envelope(&extent, srs_name));
            }
            _ => {
                let shape = Shape::from_geometry(geometry)?;
                inner.push_str(&self.gml(&shape, srs_name));
                if operation == SpatialOperation::DWithin {
                    inner.push_str(&self.distance(geometry.distance));
                }
            }
        }

        Some(wrap_qualified(tag, &inner))
    }

    /// A spatial predicate against geometries collected from another layer.
    pub fn cross_layer(&self, filter: &CrossLayerFilter) -> Option<String> {
        let query = match filter.query_collection() {
            Ok(query) => query,
            Err(reason) => {
                tracing::warn!(target: LOG_TARGET, attribute = %filter.attribute, "{}", reason);
                return None;
            }
        };
        let tag = self.tags.spatial(filter.operation)?;
        let function = self.tags.element("Function");
        let literal = self.tags.element("Literal");
        let cql_filter = query.cql_filter.as_deref().unwrap_or("INCLUDE");
        let mut inner = self.tags.property(&filter.attribute);
        inner.push_str(&format!(
            r#"<{f} name="collectGeometries"><{f} name="queryCollection">{a}{b}<{l}>{c}</{l}></{f}></{f}>"#,
            f = function,
            l = literal,
            a = self.tags.literal(&query.type_name),
            b = self.tags.literal(&query.geometry_name),
            c = cdata(cql_filter),
        ));
        if filter.operation == SpatialOperation::DWithin {
            inner.push_str(&self.distance(filter.distance));
        }

        Some(wrap_qualified(tag, &inner))
    }

    fn distance(&self, distance: Option<f64>) -> String {
        format!(
            r#"<{0} units="m">{1}</{0}>"#,
            self.tags.element("Distance"),
            ordinate(distance.unwrap_or(0.0))
        )
    }

    /// Joins predicate fragments: one is used as is, several are AND-ed.
    pub fn combine(&self, mut fragments: Vec<String>) -> Option<String> {
        match fragments.len() {
            0 => None,
            1 => fragments.pop(),
            _ => Some(self.tags.wrap("And", &fragments.concat())),
        }
    }

    pub fn filter_element(&self, predicate: &str) -> String {
        self.tags.wrap("Filter", predicate)
    }

    fn gml(&self, shape: &Shape, srs_name: Option<&str>) -> String {
        match shape {
            Shape::Point(position) => self.gml_point(position, srs_name),
            Shape::MultiPoint(points) => {
                let members: String = points
                    .iter()
                    .map(|p| format!("<gml:pointMember>{}</gml:pointMember>", self.gml_point(p, None)))
                    .collect();
                format!(
                    "<gml:MultiPoint{}>{}</gml:MultiPoint>",
                    srs_attr(srs_name),
                    members
                )
            }
            Shape::Polygon(rings) => self.gml_polygon(rings, srs_name),
            Shape::MultiPolygon(polygons) => {
                if self.version.uses_gml32() {
                    let members: String = polygons.iter().map(|p| self.gml_polygon(p, None)).collect();
                    format!(
                        "<gml:MultiSurface{}><gml:surfaceMembers>{}</gml:surfaceMembers></gml:MultiSurface>",
                        srs_attr(srs_name),
                        members
                    )
                } else {
                    let members: String = polygons
                        .iter()
                        .map(|p| {
                            format!(
                                "<gml:polygonMember>{}</gml:polygonMember>",
                                self.gml_polygon(p, None)
                            )
                        })
                        .collect();
                    format!(
                        "<gml:MultiPolygon{}>{}</gml:MultiPolygon>",
                        srs_attr(srs_name),
                        members
                    )
                }
            }
        }
    }

    fn gml_point(&self, position: &Position, srs_name: Option<&str>) -> String {
        let coordinates = if self.version.uses_gml2() {
            format!(
                "<gml:coord><X>{}</X><Y>{}</Y></gml:coord>",
                ordinate(position[0]),
                ordinate(position[1])
            )
        } else {
            format!("<gml:pos>{}</gml:pos>", join_position(position, " "))
        };
        format!(
            r#"<gml:Point srsDimension="2"{}>{}</gml:Point>"#,
            srs_attr(srs_name),
            coordinates
        )
    }

    fn gml_polygon(&self, rings: &[Ring], srs_name: Option<&str>) -> String {
        let gml2 = self.version.uses_gml2();
        let (exterior, interior) = if gml2 {
            ("outerBoundaryIs", "innerBoundaryIs")
        } else {
            ("exterior", "interior")
        };
        let body: String = rings
            .iter()
            .enumerate()
            .map(|(index, ring)| {
                let boundary = if index == 0 { exterior } else { interior };
                let coordinates = if gml2 {
                    format!("<gml:coordinates>{}</gml:coordinates>", join_ring(ring, ",", " "))
                } else {
                    format!("<gml:posList>{}</gml:posList>", join_ring(ring, " ", " "))
                };
                format!(
                    "<gml:{0}><gml:LinearRing>{1}</gml:LinearRing></gml:{0}>",
                    boundary, coordinates
                )
            })
            .collect();
        format!("<gml:Polygon{}>{}</gml:Polygon>", srs_attr(srs_name), body)
    }
}

fn envelope(extent: &[f64; 4], srs_name: Option<&str>) -> String {
    format!(
        "<gml:Envelope{}><gml:lowerCorner>{} {}</gml:lowerCorner><gml:upperCorner>{} {}</gml:upperCorner></gml:Envelope>",
        srs_attr(srs_name),
        ordinate(extent[0]),
        ordinate(extent[1]),
        ordinate(extent[2]),
        ordinate(extent[3]),
    )
}

fn srs_attr(srs_name: Option<&str>) -> String {
    srs_name
        .map(|srs| format!(r#" srsName="{}""#, escape_attr(srs)))
        .unwrap_or_default()
}

/// Escapes the `PropertyIsLike` wildcard, single-char and escape characters
/// inside a user value.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '.' | '!') {
            out.push('!');
        }
        out.push(c);
    }
    out
}

/// A WFS `GetFeature` request around an already-encoded `<Filter>`.
#[derive(Debug, Clone, Default)]
pub struct GetFeature<'a> {
    pub type_name: &'a str,
    pub pagination: Option<Pagination>,
    pub hits: bool,
    pub output_format: Option<&'a str>,
    pub srs_name: Option<&'a str>,
    /// Encoded `<ns:Filter>` element; `None` queries everything
    pub filter: Option<&'a str>,
    pub property_names: &'a [String],
    pub sort: Option<(&'a str, &'a str)>,
}

impl GetFeature<'_> {
    pub fn to_xml(&self, writer: &OgcWriter<'_>) -> String {
        let version = writer.version;
        let tags = writer.tags();
        let mut xml = self.open_tag(version);

        let type_attr = if version.uses_gml32() { "typeNames" } else { "typeName" };
        xml.push_str(&format!(
            r#"<wfs:Query {}="{}"{}>"#,
            type_attr,
            escape_attr(self.type_name),
            srs_attr(self.srs_name)
        ));
        if let Some(filter) = self.filter {
            xml.push_str(filter);
        }
        for name in self.property_names {
            xml.push_str(&tags.property(name));
        }
        if let Some((sort_by, sort_order)) = self.sort {
            let property = format!(
                "{}{}",
                tags.property(sort_by),
                tags.wrap("SortOrder", &escape_text(sort_order))
            );
            xml.push_str(&tags.wrap("SortBy", &tags.wrap("SortProperty", &property)));
        }
        xml.push_str("</wfs:Query></wfs:GetFeature>");
        xml
    }

    fn open_tag(&self, version: &WfsVersion) -> String {
        let mut attrs = String::from("<wfs:GetFeature ");
        let explicit_format = self.output_format.filter(|f| !f.is_empty());
        if !version.uses_gml2() {
            if let Some(format) = explicit_format {
                attrs.push_str(&format!(r#"outputFormat="{}" "#, escape_attr(format)));
            }
        }
        let pagination = self.pagination.unwrap_or_default();
        if let Some(start) = pagination.start_index {
            attrs.push_str(&format!(r#"startIndex="{}" "#, start));
        }
        let page_attr = if version.uses_gml32() { "count" } else { "maxFeatures" };
        if let Some(max) = pagination.max_features.filter(|max| *max > 0) {
            attrs.push_str(&format!(r#"{}="{}" "#, page_attr, max));
        }
        let wants_hits = if version.uses_gml32() {
            self.hits && self.pagination.is_none()
        } else {
            self.hits
        };
        if wants_hits {
            attrs.push_str(r#"resultType="hits" "#);
        }

        attrs.push_str(&format!(r#"service="WFS" version="{}" "#, escape_attr(version.as_str())));
        match version {
            WfsVersion::V1_0_0 => attrs.push_str(&format!(
                concat!(
                    r#"outputFormat="{}" "#,
                    r#"xmlns:gml="http://www.opengis.net/gml" "#,
                    r#"xmlns:wfs="http://www.opengis.net/wfs" "#,
                    r#"xmlns:ogc="http://www.opengis.net/ogc" "#,
                    r#"xmlns:xsi="{}" "#,
                    r#"xsi:schemaLocation="http://www.opengis.net/wfs http://schemas.opengis.net/wfs/1.0.0/WFS-basic.xsd">"#
                ),
                escape_attr(explicit_format.unwrap_or("GML2")),
                XSI_URI
            )),
            WfsVersion::V1_1_0 => attrs.push_str(&format!(
                concat!(
                    r#"xmlns:gml="http://www.opengis.net/gml" "#,
                    r#"xmlns:wfs="http://www.opengis.net/wfs" "#,
                    r#"xmlns:ogc="http://www.opengis.net/ogc" "#,
                    r#"xmlns:xsi="{}" "#,
                    r#"xsi:schemaLocation="http://www.opengis.net/wfs http://schemas.opengis.net/wfs/1.1.0/wfs.xsd">"#
                ),
                XSI_URI
            )),
            WfsVersion::V2_0 | WfsVersion::Other(_) => attrs.push_str(&format!(
                concat!(
                    r#"xmlns:wfs="http://www.opengis.net/wfs/2.0" "#,
                    r#"xmlns:fes="http://www.opengis.net/fes/2.0" "#,
                    r#"xmlns:gml="http://www.opengis.net/gml/3.2" "#,
                    r#"xmlns:xsi="{}" "#,
                    r#"xsi:schemaLocation="http://www.opengis.net/wfs/2.0 http://schemas.opengis.net/wfs/2.0/wfs.xsd "#,
                    r#"http://www.opengis.net/gml/3.2 http://schemas.opengis.net/gml/3.2.1/gml.xsd">"#
                ),
                XSI_URI
            )),
        }
        attrs
    }
}

/// WFS 2.0 `GetPropertyValue` request for every value of one attribute.
pub fn get_property_value(type_name: &str, attribute: &str) -> String {
    format!(
        concat!(
            r#"<wfs:GetPropertyValue service="WFS" valueReference="{}" version="2.0" "#,
            r#"xmlns:fes="http://www.opengis.net/fes/2.0" "#,
            r#"xmlns:gml="http://www.opengis.net/gml/3.2" "#,
            r#"xmlns:wfs="http://www.opengis.net/wfs/2.0" "#,
            r#"xmlns:xsi="{}" "#,
            r#"xsi:schemaLocation="http://www.opengis.net/wfs/2.0 http://schemas.opengis.net/wfs/2.0/wfs.xsd "#,
            r#"http://www.opengis.net/gml/3.2 http://schemas.opengis.net/gml/3.2.1/gml.xsd">"#,
            r#"<wfs:Query typeNames="{}"/></wfs:GetPropertyValue>"#
        ),
        escape_attr(attribute),
        XSI_URI,
        escape_attr(type_name)
    )
}
