//! SLD 1.0.0 wrapper carrying a filter as a highlight rule.

use crate::config::SldMark;
use crate::version::{Namespace, WfsVersion};
use crate::xml::{escape_attr, escape_text};

/// The `<prefix:Filter>...</prefix:Filter>` element of an encoded request,
/// closing tag included. Only the prefix of `namespace` is matched.
pub fn extract_filter(request: &str, namespace: Namespace) -> Option<&str> {
    let open = format!("<{}:Filter>", namespace.prefix());
    let close = format!("</{}:Filter>", namespace.prefix());
    let start = request.find(&open)?;
    let end = request[start..].rfind(&close)? + start + close.len();
    Some(&request[start..end])
}

/// A point-symbolized `StyledLayerDescriptor` with one rule. A `None`
/// filter yields a rule matching every feature.
pub fn styled_layer(type_name: &str, filter: Option<&str>, version: &WfsVersion, mark: &SldMark) -> String {
    let namespace = version.namespace();
    format!(
        concat!(
            r#"<StyledLayerDescriptor version="1.0.0" "#,
            r#"xsi:schemaLocation="http://www.opengis.net/sld StyledLayerDescriptor.xsd" "#,
            r#"xmlns="http://www.opengis.net/sld" "#,
            r#"xmlns:{prefix}="{ns_uri}" "#,
            r#"xmlns:gml="{gml_uri}" "#,
            r#"xmlns:xlink="http://www.w3.org/1999/xlink" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<NamedLayer><Name>{name}</Name><UserStyle><FeatureTypeStyle><Rule>{filter}",
            "<PointSymbolizer><Graphic><Mark><WellKnownName>{mark}</WellKnownName>",
            r#"<Fill><CssParameter name="fill">{fill}</CssParameter></Fill></Mark>"#,
            "<Size>{size}</Size></Graphic></PointSymbolizer>",
            "</Rule></FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"
        ),
        prefix = namespace.prefix(),
        ns_uri = namespace.uri(),
        gml_uri = version.gml_uri(),
        name = escape_text(type_name),
        filter = filter.unwrap_or_default(),
        mark = escape_text(&mark.well_known_name),
        fill = escape_attr(&mark.fill),
        size = mark.size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_uses_the_requested_prefix() {
        let request = concat!(
            r#"<wfs:GetFeature><wfs:Query typeNames="a">"#,
            "<fes:Filter><fes:And><fes:Filter-like/></fes:And></fes:Filter>",
            "<fes:ValueReference>x</fes:ValueReference></wfs:Query></wfs:GetFeature>"
        );
        assert_eq!(
            extract_filter(request, Namespace::Fes),
            Some("<fes:Filter><fes:And><fes:Filter-like/></fes:And></fes:Filter>")
        );
        assert_eq!(extract_filter(request, Namespace::Ogc), None);
    }

    #[test]
    fn test_extract_without_filter() {
        let request = r#"<wfs:GetFeature><wfs:Query typeName="a"></wfs:Query></wfs:GetFeature>"#;
        assert_eq!(extract_filter(request, Namespace::Ogc), None);
    }

    #[test]
    fn test_styled_layer() {
        let filter = "<ogc:Filter><ogc:Or></ogc:Or></ogc:Filter>";
        let sld = styled_layer("topp:states", Some(filter), &WfsVersion::V1_1_0, &SldMark::default());
        assert!(sld.starts_with(r#"<StyledLayerDescriptor version="1.0.0" "#));
        assert!(sld.contains(r#"xmlns:ogc="http://www.opengis.net/ogc""#));
        assert!(sld.contains("<NamedLayer><Name>topp:states</Name>"));
        assert!(sld.contains(&format!("<Rule>{}<PointSymbolizer>", filter)));
        assert!(sld.contains("<WellKnownName>circle</WellKnownName>"));
        assert!(sld.contains(r#"<CssParameter name="fill">#0000FF</CssParameter>"#));
        assert!(sld.contains("<Size>20</Size>"));
    }

    #[test]
    fn test_styled_layer_declares_fes_for_2_0() {
        let sld = styled_layer("a", None, &WfsVersion::V2_0, &SldMark::default());
        assert!(sld.contains(r#"xmlns:fes="http://www.opengis.net/fes/2.0""#));
        assert!(sld.contains(r#"xmlns:gml="http://www.opengis.net/gml/3.2""#));
        assert!(sld.contains("<Rule><PointSymbolizer>"));
    }
}
