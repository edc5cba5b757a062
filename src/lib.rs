//! # promframes
//!
//! Streaming decoder for Prometheus and Loki HTTP query responses.
//!
//! A response body is walked with `serde_json`'s streaming deserializer and
//! turned into [`Frame`]s:
//! tables of equal-length typed columns with metadata describing how the
//! result should be visualized. Frames can be exported to Arrow
//! [`RecordBatch`](arrow_array::RecordBatch)es for display or further
//! processing.
//!
//! ## Supported payloads
//!
//! - **matrix / vector**: one frame per series, heatmap cells for sparse
//!   histograms
//! - **streams**: Loki log lines with per-line labels
//! - **scalar / string**: single-sample frames
//! - **bare arrays**: label names/values, label sets and exemplars
//!
//! ```
//! use promframes::{decode, DecoderOptions};
//!
//! let body = br#"{"status":"success","data":{"resultType":"scalar","result":[1609459200,"1"]}}"#;
//! let frames = decode(body, &DecoderOptions::default()).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

pub mod config;
pub mod converter;
pub mod frame;
pub mod telemetry;
pub mod time;

mod error;

pub use config::DecoderOptions;
pub use converter::{decode, decode_reader, read_prometheus_style_result, ResultType};
pub use error::{Error, Result};
pub use frame::{Field, FieldType, Frame, FrameMeta, FrameType, Labels, Notice, Severity};
