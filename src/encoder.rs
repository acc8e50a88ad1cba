//! The public encoding entry points.
//!
//! A [`FilterEncoder`] turns one [`FilterDescriptor`] (or its JSON text) into
//! a WFS `GetFeature` request, a CQL predicate or an SLD rule. All three share
//! the same fragment sources:
//!
//! 1. the attribute filter, from the first group of `groupFields` or from
//!    `simpleFilterFields`
//! 2. the spatial field
//! 3. every cross-layer filter
//!
//! Encoders hold only their configuration; tag tables are resolved per call.

use crate::config::{EmptyFilterPolicy, EncoderConfig, FieldSourcePolicy};
use crate::cql;
use crate::descriptor::{FilterDescriptor, FilterInput, SimpleFilterField, SortOptions};
use crate::error::EncodeError;
use crate::group_tree::GroupTree;
use crate::ogc::{self, GetFeature, OgcWriter};
use crate::sld;
use crate::version::WfsVersion;
use crate::LOG_TARGET;

/// Per-call options of [`FilterEncoder::to_ogc_filter`]. Values given here
/// override `sortOptions` and `hits` stored in the descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OgcOptions {
    /// `None` uses the configured default version
    pub version: Option<String>,
    pub sort_options: Option<SortOptions>,
    pub hits: Option<bool>,
    pub output_format: Option<String>,
    pub property_names: Vec<String>,
}

impl OgcOptions {
    pub fn version(version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }
}

/// Where the attribute filter of a descriptor comes from.
enum AttributeSource<'d> {
    Groups(GroupTree<'d>),
    Simple(&'d [SimpleFilterField]),
    None,
}

#[derive(Debug, Clone, Default)]
pub struct FilterEncoder {
    config: EncoderConfig,
}

impl FilterEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes a WFS `GetFeature` request whose `<Filter>` carries every
    /// predicate of the descriptor.
    pub fn to_ogc_filter<'a>(
        &self,
        type_name: &str,
        input: impl Into<FilterInput<'a>>,
        options: &OgcOptions,
    ) -> Result<String, EncodeError> {
        let descriptor = input.into().resolve()?;
        let version = self.resolve_version(options.version.as_deref());
        let writer = OgcWriter::new(&version);
        let filter = self.ogc_filter_element(&writer, &descriptor)?;

        let sort = options
            .sort_options
            .as_ref()
            .or(descriptor.sort_options.as_ref())
            .and_then(SortOptions::resolved);
        let request = GetFeature {
            type_name,
            pagination: descriptor.pagination,
            hits: options.hits.unwrap_or(descriptor.hits),
            output_format: options.output_format.as_deref(),
            srs_name: self.config.query_srs_name.as_deref(),
            filter: filter.as_deref(),
            property_names: &options.property_names,
            sort,
        };
        Ok(request.to_xml(&writer))
    }

    /// Encodes the descriptor as a CQL predicate.
    pub fn to_cql_filter<'a>(&self, input: impl Into<FilterInput<'a>>) -> Result<String, EncodeError> {
        let descriptor = input.into().resolve()?;

        let mut fragments = Vec::new();
        match self.attribute_source(&descriptor)? {
            AttributeSource::Groups(tree) => {
                fragments.extend(tree.root().and_then(|root| cql::group(&tree, root)))
            }
            AttributeSource::Simple(fields) => fragments.push(cql::simple_fields(fields)),
            AttributeSource::None => {}
        }
        if let Some((field, operation, geometry)) = descriptor.spatial() {
            fragments.extend(cql::spatial(field, operation, geometry));
        }
        fragments.extend(descriptor.cross_layer_filters().iter().filter_map(cql::cross_layer));

        tracing::debug!(target: LOG_TARGET, kind = "cql", fragments = fragments.len(), "encoding filter");
        match cql::combine(&fragments) {
            Some(cql) => Ok(cql),
            None => self.empty_filter().map(|()| "INCLUDE".to_string()),
        }
    }

    /// Wraps the `<Filter>` of the equivalent `GetFeature` request in a
    /// point-symbolized SLD rule.
    pub fn get_sld<'a>(
        &self,
        type_name: &str,
        input: impl Into<FilterInput<'a>>,
        version: Option<&str>,
    ) -> Result<String, EncodeError> {
        let options = OgcOptions {
            version: version.map(str::to_string),
            ..Default::default()
        };
        let request = self.to_ogc_filter(type_name, input, &options)?;
        let version = self.resolve_version(version);
        let filter = sld::extract_filter(&request, version.namespace());
        Ok(sld::styled_layer(type_name, filter, &version, &self.config.sld_mark))
    }

    /// A WFS 2.0 `GetPropertyValue` request listing every value of `attribute`.
    pub fn get_ogc_all_property_value(&self, type_name: &str, attribute: &str) -> String {
        ogc::get_property_value(type_name, attribute)
    }

    fn resolve_version(&self, requested: Option<&str>) -> WfsVersion {
        let label = requested
            .filter(|version| !version.trim().is_empty())
            .unwrap_or(&self.config.default_version);
        WfsVersion::normalize(Some(label))
    }

    fn ogc_filter_element(
        &self,
        writer: &OgcWriter<'_>,
        descriptor: &FilterDescriptor,
    ) -> Result<Option<String>, EncodeError> {
        let mut fragments = Vec::new();
        // Simple fields that all drop out match everything, like CQL's INCLUDE.
        let mut include_all = false;
        match self.attribute_source(descriptor)? {
            AttributeSource::Groups(tree) => {
                fragments.extend(tree.root().and_then(|root| writer.group(&tree, root)))
            }
            AttributeSource::Simple(fields) => match writer.simple_fields(fields) {
                Some(fragment) => fragments.push(fragment),
                None => include_all = true,
            },
            AttributeSource::None => {}
        }
        if let Some((field, operation, geometry)) = descriptor.spatial() {
            fragments.extend(writer.spatial(field, operation, geometry));
        }
        fragments.extend(
            descriptor
                .cross_layer_filters()
                .iter()
                .filter_map(|filter| writer.cross_layer(filter)),
        );

        tracing::debug!(
            target: LOG_TARGET,
            kind = "ogc",
            namespace = %writer.tags().namespace(),
            fragments = fragments.len(),
            "encoding filter"
        );
        match writer.combine(fragments) {
            Some(predicate) => Ok(Some(writer.filter_element(&predicate))),
            None if include_all => Ok(None),
            None => self.empty_filter().map(|()| None),
        }
    }

    fn attribute_source<'d>(&self, descriptor: &'d FilterDescriptor) -> Result<AttributeSource<'d>, EncodeError> {
        let has_fields = !descriptor.filter_fields.is_empty();
        let has_simple = !descriptor.simple_filter_fields.is_empty();

        if has_fields && has_simple && self.config.field_sources == FieldSourcePolicy::Strict {
            return Err(EncodeError::AmbiguousFieldSources);
        }
        if has_fields {
            if descriptor.group_fields.is_empty() {
                return Err(EncodeError::MissingGroups);
            }
            let tree = GroupTree::build(&descriptor.group_fields, &descriptor.filter_fields)?;
            return Ok(AttributeSource::Groups(tree));
        }
        if has_simple {
            return Ok(AttributeSource::Simple(&descriptor.simple_filter_fields));
        }
        Ok(AttributeSource::None)
    }

    fn empty_filter(&self) -> Result<(), EncodeError> {
        match self.config.empty_filter {
            EmptyFilterPolicy::Reject => Err(EncodeError::EmptyFilter),
            EmptyFilterPolicy::Include => {
                tracing::debug!(target: LOG_TARGET, "empty filter encoded as include-all");
                Ok(())
            }
        }
    }
}
