//! Per-frame telemetry document
//!
//! One newline-terminated JSON document is produced per processed frame:
//!
//! ```text
//! {
//!   "frame": {
//!     "fps": <int>,
//!     "fpga": <bool>,
//!     "perf": { "cpu_use": <float>, "fps": <float>, "fr_time": <int> },
//!     "results": [
//!       { "type": "bounding-boxes", "boxes": [
//!           { "id"?: <int>, "tag"?: <int>,
//!             "topleft": {"x":<int>,"y":<int>},
//!             "btmright": {"x":<int>,"y":<int>},
//!             "area": <int> } ] } ]
//!   }
//! }
//! ```
//!
//! `id` and `tag` are omitted when absent. Result kinds without a wire form
//! are skipped so older collectors keep working when producers add kinds.

use std::io::{self, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::{BoundingBox, FrameMetrics, Point, ResultRecord};
use crate::json::{Container, JsonWriter};

/// Typical encoded size of a frame with a handful of boxes
const INITIAL_CAPACITY: usize = 512;

/// Encode one frame into an owned buffer
pub fn encode_frame(results: &[ResultRecord], metrics: &FrameMetrics) -> Bytes {
    let buf = BytesMut::with_capacity(INITIAL_CAPACITY);
    match write_frame(buf.writer(), results, metrics) {
        Ok(writer) => writer.into_inner().freeze(),
        // BytesMut grows on demand; writing to it cannot fail
        Err(_) => Bytes::new(),
    }
}

/// Encode one frame into `out`, returning it once the document is complete
pub fn write_frame<W: Write>(
    out: W,
    results: &[ResultRecord],
    metrics: &FrameMetrics,
) -> io::Result<W> {
    let mut json = JsonWriter::new(out, Container::Object);

    json.object_field("frame");
    json.field("fps", metrics.target_fps);
    json.field("fpga", metrics.hardware_accelerated);

    json.object_field("perf");
    json.field("cpu_use", metrics.cpu_usage);
    json.field("fps", metrics.achieved_fps);
    json.field("fr_time", metrics.frame_time_ms);
    json.close();

    json.array_field("results");
    for record in results {
        write_result(&mut json, record);
    }

    json.finish()
}

fn write_result<W: Write>(json: &mut JsonWriter<W>, record: &ResultRecord) {
    match record {
        ResultRecord::BoundingBoxes(boxes) => write_bounding_boxes(json, record, boxes),
        ResultRecord::Points(_) | ResultRecord::Classifications(_) => {}
    }
}

fn write_bounding_boxes<W: Write>(
    json: &mut JsonWriter<W>,
    record: &ResultRecord,
    boxes: &[BoundingBox],
) {
    json.object();
    json.field("type", record.kind().as_str());
    json.array_field("boxes");

    for bbox in boxes {
        json.object();
        if let Some(id) = bbox.id {
            json.field("id", id.get());
        }
        if let Some(tag) = bbox.tag {
            json.field("tag", tag.get());
        }
        write_point(json, "topleft", bbox.bounds.top_left());
        write_point(json, "btmright", bbox.bounds.bottom_right());
        json.field("area", bbox.bounds.area());
        json.close();
    }

    json.close();
    json.close();
}

fn write_point<W: Write>(json: &mut JsonWriter<W>, key: &str, point: Point) {
    json.object_field(key);
    json.field("x", point.x);
    json.field("y", point.y);
    json.close();
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
