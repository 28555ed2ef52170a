use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in pixel space with `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    /// Builds the rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn from_xyxy(xyxy: [f64; 4]) -> Self {
        Self::from_corners(Point::new(xyxy[0], xyxy[1]), Point::new(xyxy[2], xyxy[3]))
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> Point {
        Point::new(self.x1 + self.width() / 2.0, self.y1 + self.height() / 2.0)
    }

    pub fn scaled(&self, scale: Scale) -> Self {
        Self {
            x1: self.x1 * scale.x,
            y1: self.y1 * scale.y,
            x2: self.x2 * scale.x,
            y2: self.y2 * scale.y,
        }
    }
}

/// Per-axis scale factor between two pixel spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl Scale {
    /// Factor mapping `from` coordinates onto `to`. A zero source axis maps 1:1.
    pub fn between(from: (f64, f64), to: (f64, f64)) -> Self {
        let axis = |from: f64, to: f64| if from > 0.0 { to / from } else { 1.0 };
        Self {
            x: axis(from.0, to.0),
            y: axis(from.1, to.1),
        }
    }
}

/// Canvas buffer size plus its on-screen client rect.
///
/// The buffer is sized to the image, while CSS may stretch or shrink the
/// element, so pointer positions must be rescaled to land in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasMetrics {
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub left: f64,
    pub top: f64,
    pub displayed_width: f64,
    pub displayed_height: f64,
}

impl CanvasMetrics {
    pub fn to_image_point(&self, client_x: f64, client_y: f64) -> Point {
        let scale = Scale::between(
            (self.displayed_width, self.displayed_height),
            (self.pixel_width, self.pixel_height),
        );
        Point::new((client_x - self.left) * scale.x, (client_y - self.top) * scale.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_corners() {
        let r = Rect::from_corners(Point::new(50.0, 50.0), Point::new(10.0, 10.0));
        assert_eq!(r, Rect { x1: 10.0, y1: 10.0, x2: 50.0, y2: 50.0 });
        assert_eq!(r.width(), 40.0);
        assert_eq!(r.center(), Point::new(30.0, 30.0));
    }

    #[test]
    fn pointer_mapping_under_css_scaling() {
        let metrics = CanvasMetrics {
            pixel_width: 800.0,
            pixel_height: 600.0,
            left: 10.0,
            top: 20.0,
            displayed_width: 400.0,
            displayed_height: 300.0,
        };
        assert_eq!(metrics.to_image_point(110.0, 70.0), Point::new(200.0, 100.0));
    }

    #[test]
    fn scale_with_zero_source_is_identity() {
        assert_eq!(Scale::between((0.0, 0.0), (640.0, 480.0)), Scale::default());
        let s = Scale::between((320.0, 240.0), (640.0, 480.0));
        assert_eq!(s, Scale { x: 2.0, y: 2.0 });
        let r = Rect::from_xyxy([10.0, 20.0, 30.0, 40.0]).scaled(s);
        assert_eq!(r, Rect { x1: 20.0, y1: 40.0, x2: 60.0, y2: 80.0 });
    }
}
