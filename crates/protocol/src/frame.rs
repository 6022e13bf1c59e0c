//! Per-frame result model
//!
//! These are the records handed over by the detection/tracking stage once per
//! processed frame. Only bounding-box results are serialized today; the other
//! kinds exist so producers can hand them over and they are skipped.

use std::num::NonZeroU32;

/// A point in image coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in image coordinates
///
/// `bottom_right` is exclusive: a 40x60 box at (10, 20) spans to (50, 80).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from its two corners
    ///
    /// Extents saturate at the `i32` range.
    pub const fn from_corners(top_left: Point, bottom_right: Point) -> Self {
        Self {
            x: top_left.x,
            y: top_left.y,
            width: bottom_right.x.saturating_sub(top_left.x),
            height: bottom_right.y.saturating_sub(top_left.y),
        }
    }

    pub const fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive corner, saturating at the `i32` range
    pub const fn bottom_right(&self) -> Point {
        Point::new(
            self.x.saturating_add(self.width),
            self.y.saturating_add(self.height),
        )
    }

    /// Area in pixels (widened so large frames cannot overflow)
    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

/// One detected box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Tracking identity, `None` when the producer does not track boxes
    pub id: Option<NonZeroU32>,
    /// Metadata tag linking the box to other results
    pub tag: Option<NonZeroU32>,
    pub bounds: Rect,
}

impl BoundingBox {
    pub const fn new(bounds: Rect) -> Self {
        Self {
            id: None,
            tag: None,
            bounds,
        }
    }

    /// Set the identity; 0 means "no identity"
    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = NonZeroU32::new(id);
        self
    }

    /// Set the tag; 0 means "no tag"
    #[must_use]
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = NonZeroU32::new(tag);
        self
    }
}

/// A classification assigned to the whole frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Class name, empty when unknown
    pub name: String,
    pub id: Option<NonZeroU32>,
    pub tag: Option<NonZeroU32>,
}

/// Kind discriminant of a [`ResultRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    BoundingBoxes,
    Points,
    Classifications,
}

impl ResultKind {
    /// Wire name of the kind
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BoundingBoxes => "bounding-boxes",
            Self::Points => "points",
            Self::Classifications => "classifications",
        }
    }
}

/// Result produced by an algorithm for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultRecord {
    BoundingBoxes(Vec<BoundingBox>),
    Points(Vec<Point>),
    Classifications(Vec<Classification>),
}

impl ResultRecord {
    pub const fn kind(&self) -> ResultKind {
        match self {
            Self::BoundingBoxes(_) => ResultKind::BoundingBoxes,
            Self::Points(_) => ResultKind::Points,
            Self::Classifications(_) => ResultKind::Classifications,
        }
    }
}

/// Performance counters reported alongside each frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameMetrics {
    /// Frame rate the pipeline is configured for
    pub target_fps: i32,
    /// Sequence number of the frame
    pub frame_index: u64,
    /// Whether the result came from the hardware-accelerated path
    pub hardware_accelerated: bool,
    /// Process CPU utilization in percent
    pub cpu_usage: f64,
    /// Frame rate actually achieved
    pub achieved_fps: f64,
    /// Processing time of this frame in milliseconds
    pub frame_time_ms: i32,
}
