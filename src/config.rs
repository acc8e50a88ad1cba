//! 配置模块，负责加载编码器的JSON配置文件

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to do when a descriptor carries no predicate at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyFilterPolicy {
    /// Fail with `EncodeError::EmptyFilter`
    #[default]
    Reject,
    /// Match everything: no `<Filter>` in OGC output, `INCLUDE` in CQL
    Include,
}

/// How to treat a descriptor with both `filterFields` and `simpleFilterFields`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldSourcePolicy {
    /// Fail with `EncodeError::AmbiguousFieldSources`
    #[default]
    Strict,
    /// Use `filterFields` and ignore the simple fields
    PreferGroups,
}

/// Point symbolizer of the SLD wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SldMark {
    pub well_known_name: String,
    pub fill: String,
    pub size: u32,
}

impl Default for SldMark {
    fn default() -> Self {
        Self {
            well_known_name: "circle".to_string(),
            fill: "#0000FF".to_string(),
            size: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderConfig {
    /// Version used when a call does not name one
    pub default_version: String,
    /// `srsName` of `<wfs:Query>`; `None` leaves the attribute out
    pub query_srs_name: Option<String>,
    pub empty_filter: EmptyFilterPolicy,
    pub field_sources: FieldSourcePolicy,
    pub sld_mark: SldMark,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            default_version: "2.0".to_string(),
            query_srs_name: Some("EPSG:4326".to_string()),
            empty_filter: EmptyFilterPolicy::default(),
            field_sources: FieldSourcePolicy::default(),
            sld_mark: SldMark::default(),
        }
    }
}

impl EncoderConfig {
    /// 从JSON文件加载编码器配置，缺少的键使用默认值
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::Missing(path_ref.display().to_string()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;

        // 解析JSON
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path_ref.display().to_string(),
            source,
        })
    }
}
