//! Encodes map-client filter descriptors as OGC Filter Encoding requests
//! (WFS 1.0.0, 1.1.0 and 2.0), CQL predicates and SLD rules.
//!
//! ```
//! use ogc_filter_encoder::{FilterEncoder, OgcOptions};
//!
//! let json = r#"{"simpleFilterFields": [{"attribute": "highway_system", "type": "list",
//!                "operator": "=", "values": ["state"]}]}"#;
//! let encoder = FilterEncoder::new();
//! assert_eq!(encoder.to_cql_filter(json).unwrap(), "((highway_system IN('state')))");
//! let xml = encoder.to_ogc_filter("topp:roads", json, &OgcOptions::version("1.1.0")).unwrap();
//! assert!(xml.contains("<ogc:Filter>"));
//! ```

pub mod config;
pub mod cql;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod group_tree;
pub mod ogc;
pub mod predicate;
pub mod sld;
pub mod tags;
pub mod version;
pub mod xml;

pub use config::EncoderConfig;
pub use descriptor::{FilterDescriptor, FilterInput, SortOptions};
pub use encoder::{FilterEncoder, OgcOptions};
pub use error::{ConfigError, EncodeError};
pub use version::WfsVersion;

/// Target of every `tracing` event emitted while encoding.
pub(crate) const LOG_TARGET: &str = "ogc_filter::encode";
