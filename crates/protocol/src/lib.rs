//! Framecast Protocol - wire format for per-frame telemetry
//!
//! This crate defines what is shipped to the collector once per processed
//! frame:
//! - [`json`] - Streaming JSON writer with an explicit open-container stack
//! - [`frame`] - Result records and frame metrics handed over by the vision stage
//! - [`document`] - The per-frame document built from those records
//!
//! # Example
//!
//! ```
//! use framecast_protocol::{BoundingBox, FrameMetrics, Rect, ResultRecord, encode_frame};
//!
//! let results = vec![ResultRecord::BoundingBoxes(vec![
//!     BoundingBox::new(Rect::new(10, 20, 40, 60)).with_id(3),
//! ])];
//! let metrics = FrameMetrics { target_fps: 15, ..Default::default() };
//!
//! let bytes = encode_frame(&results, &metrics);
//! assert!(bytes.starts_with(b"{\"frame\":{\"fps\":15"));
//! ```

pub mod document;
pub mod frame;
pub mod json;

pub use document::{encode_frame, write_frame};
pub use frame::{
    BoundingBox, Classification, FrameMetrics, Point, Rect, ResultKind, ResultRecord,
};
pub use json::{Container, JsonWriter, Value};

// Re-export bytes for convenience
pub use bytes::Bytes;
