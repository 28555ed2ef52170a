//! Display list shared by the annotation canvas and the detection overlay.
//!
//! Scenes are built here and replayed onto a 2D canvas context by the
//! frontend, which only has to know how to execute each [`DrawOp`].

use crate::geometry::{ImageSize, Rect};

pub const LINE_WIDTH: f64 = 3.0;
pub const FONT: &str = "16px sans-serif";
pub const PENDING_DASH: [f64; 2] = [6.0, 4.0];

pub const ANNOTATION_STROKE: &str = "#f97316";
pub const DETECTION_STROKE: &str = "#22c55e";
pub const DETECTION_FILL: &str = "rgba(34,197,94,0.2)";
pub const PENDING_STROKE: &str = "#22c55e";
pub const LABEL_BACKGROUND: &str = "rgba(0,0,0,0.75)";
pub const LABEL_TEXT: &str = "#ffffff";

pub const LABEL_HEIGHT: f64 = 20.0;
pub const LABEL_PADDING: f64 = 5.0;

/// Where a box label sits relative to the box's top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPlacement {
    /// Background bottom 4 px above the edge; never above `y = 0`.
    Raised,
    /// Background bottom 2 px below the edge, clamped at the canvas top.
    Flush,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Base image at native resolution; the canvas buffer takes this size.
    Image(ImageSize),
    StrokeRect {
        rect: Rect,
        color: &'static str,
        dashed: bool,
    },
    FillRect {
        rect: Rect,
        color: &'static str,
    },
    /// Text on a dark background, `LABEL_PADDING` px of padding on both sides.
    Label {
        x: f64,
        background_top: f64,
        baseline: f64,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub size: ImageSize,
    pub ops: Vec<DrawOp>,
}

impl Scene {
    pub fn new(size: ImageSize) -> Self {
        Self {
            size,
            ops: vec![DrawOp::Image(size)],
        }
    }

    /// True when nothing but the base image is drawn.
    pub fn is_bare(&self) -> bool {
        self.ops.len() == 1
    }

    pub fn push_box(
        &mut self,
        rect: Rect,
        stroke: &'static str,
        fill: Option<&'static str>,
        label: impl Into<String>,
        placement: LabelPlacement,
    ) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color: stroke,
            dashed: false,
        });
        if let Some(color) = fill {
            self.ops.push(DrawOp::FillRect { rect, color });
        }
        self.ops.push(label_at(rect, label.into(), placement));
    }

    pub fn push_pending(&mut self, rect: Rect) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color: PENDING_STROKE,
            dashed: true,
        });
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Label { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

fn label_at(rect: Rect, text: String, placement: LabelPlacement) -> DrawOp {
    let (background_top, baseline) = match placement {
        LabelPlacement::Raised => {
            let top = (rect.y1 - 6.0).max(18.0);
            (top - 18.0, top - 3.0)
        }
        // top and baseline are clamped separately, so near the edge the text sits low
        LabelPlacement::Flush => ((rect.y1 - 18.0).max(0.0), (rect.y1 - 3.0).max(14.0)),
    };
    DrawOp::Label {
        x: rect.x1,
        background_top,
        baseline,
        text,
    }
}
