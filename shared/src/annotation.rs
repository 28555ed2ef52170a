//! Hand annotation of a single training image.
//!
//! An [`AnnotationSession`] owns the boxes drawn over the currently loaded
//! image. Boxes live in image-pixel space, so loading another image discards
//! them. The drag gesture is an explicit `Idle -> Drawing -> Idle` machine;
//! calls that arrive in the wrong state are rejected instead of silently
//! clobbering the rectangle in progress.

use crate::error::AnnotationError;
use crate::geometry::{ImageSize, Point, Rect};
use crate::render::{ANNOTATION_STROKE, LabelPlacement, Scene};
use image::ImageDecoder;
use image::metadata::Orientation;
use serde::Serialize;
use std::io::Cursor;

pub const DEFAULT_MIN_BOX_SIZE: f64 = 5.0;

/// Displayed size of an encoded image, read from its header.
///
/// EXIF rotations by a quarter turn swap the axes, matching what a browser
/// shows for the same file.
pub fn image_dimensions(bytes: &[u8]) -> Result<ImageSize, AnnotationError> {
    let mut decoder = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_decoder()?;
    let (width, height) = decoder.dimensions();
    let orientation = decoder.orientation().unwrap_or_else(|e| {
        log::debug!("ignoring unreadable orientation: {}", e);
        Orientation::NoTransforms
    });

    Ok(match orientation {
        Orientation::Rotate90
        | Orientation::Rotate270
        | Orientation::Rotate90FlipH
        | Orientation::Rotate270FlipH => ImageSize::new(height, width),
        _ => ImageSize::new(width, height),
    })
}

/// Label text offered for a manual upload: one centred box of class 0.
pub const SAMPLE_LABEL_TEXT: &str = "0 0.5 0.5 0.4 0.4";

/// Hand-written YOLO label text, trimmed line by line with blank lines dropped.
pub fn manual_label_text(text: &str) -> Result<String, AnnotationError> {
    let labels = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if labels.is_empty() {
        return Err(AnnotationError::EmptyLabels);
    }
    Ok(labels)
}

/// Fixed class name to id mapping, in id order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCatalog {
    classes: Vec<(String, u32)>,
}

impl ClassCatalog {
    /// Id used when the selected class is missing from the catalog.
    pub const FALLBACK_ID: u32 = 2;

    /// Assigns ids by position: the first name gets id 0.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes = names
            .into_iter()
            .enumerate()
            .map(|(id, name)| (name.into(), id as u32))
            .collect();
        Self { classes }
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.classes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.classes
            .iter()
            .find(|(_, i)| *i == id)
            .map(|(n, _)| n.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::from_names(["person", "car", "airplane"])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnnotationBox {
    pub class_id: u32,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing { anchor: Point, current: Point },
}

#[derive(Debug, Clone)]
pub struct AnnotationSession {
    catalog: ClassCatalog,
    selected_class: String,
    min_box_size: f64,
    image: Option<ImageSize>,
    boxes: Vec<AnnotationBox>,
    state: DrawState,
}

impl AnnotationSession {
    pub fn new(catalog: ClassCatalog, selected_class: impl Into<String>, min_box_size: f64) -> Self {
        Self {
            catalog,
            selected_class: selected_class.into(),
            min_box_size,
            image: None,
            boxes: Vec::new(),
            state: DrawState::Idle,
        }
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    pub fn selected_class(&self) -> &str {
        &self.selected_class
    }

    /// Selects a class by name. Names outside the catalog are refused.
    pub fn select_class(&mut self, name: &str) -> bool {
        if self.catalog.id_of(name).is_none() {
            log::warn!("ignoring unknown class {:?}", name);
            return false;
        }
        self.selected_class = name.to_string();
        true
    }

    pub fn selected_class_id(&self) -> u32 {
        self.catalog
            .id_of(&self.selected_class)
            .unwrap_or(ClassCatalog::FALLBACK_ID)
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.image
    }

    pub fn boxes(&self) -> &[AnnotationBox] {
        &self.boxes
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    pub fn pending_rect(&self) -> Option<Rect> {
        match self.state {
            DrawState::Drawing { anchor, current } => Some(Rect::from_corners(anchor, current)),
            DrawState::Idle => None,
        }
    }

    /// Reads the image dimensions from encoded bytes and starts over on that image.
    ///
    /// Only the header is decoded. Previous boxes are dropped even when the
    /// bytes turn out to be unreadable.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<ImageSize, AnnotationError> {
        self.reset(None);
        let size = image_dimensions(bytes)?;
        self.reset(Some(size));
        Ok(size)
    }

    /// Sets the image size only if none is known yet; boxes already drawn are kept.
    ///
    /// Returns whether `size` was taken.
    pub fn adopt_image_size(&mut self, size: ImageSize) -> bool {
        match self.image {
            Some(known) => {
                if known != size {
                    log::warn!(
                        "keeping image size {}x{}, ignoring {}x{}",
                        known.width,
                        known.height,
                        size.width,
                        size.height
                    );
                }
                false
            }
            None => {
                self.reset(Some(size));
                true
            }
        }
    }

    /// Same as [`load_image`](Self::load_image) for an image that is already decoded.
    pub fn set_image_size(&mut self, size: ImageSize) {
        self.reset(Some(size));
    }

    pub fn unload(&mut self) {
        self.reset(None);
    }

    fn reset(&mut self, image: Option<ImageSize>) {
        self.image = image;
        self.boxes.clear();
        self.state = DrawState::Idle;
    }

    pub fn begin_box(&mut self, at: Point) -> Result<(), AnnotationError> {
        if self.image.is_none() {
            return Err(AnnotationError::NoImage);
        }
        if self.is_drawing() {
            return Err(AnnotationError::AlreadyDrawing);
        }
        self.state = DrawState::Drawing {
            anchor: at,
            current: at,
        };
        Ok(())
    }

    pub fn update_box(&mut self, at: Point) -> Result<(), AnnotationError> {
        match &mut self.state {
            DrawState::Drawing { current, .. } => {
                *current = at;
                Ok(())
            }
            DrawState::Idle => Err(AnnotationError::NotDrawing),
        }
    }

    /// Ends the drag. Returns the stored box, or `None` when the rectangle was
    /// too small on either axis and got discarded.
    pub fn commit_box(&mut self) -> Result<Option<AnnotationBox>, AnnotationError> {
        let rect = self.pending_rect().ok_or(AnnotationError::NotDrawing)?;
        self.state = DrawState::Idle;

        if rect.width() < self.min_box_size || rect.height() < self.min_box_size {
            log::debug!("discarding {:.1}x{:.1} box", rect.width(), rect.height());
            return Ok(None);
        }

        let annotation = AnnotationBox {
            class_id: self.selected_class_id(),
            rect,
        };
        self.boxes.push(annotation);
        Ok(Some(annotation))
    }

    pub fn cancel_box(&mut self) {
        self.state = DrawState::Idle;
    }

    pub fn remove_last_box(&mut self) -> Option<AnnotationBox> {
        self.boxes.pop()
    }

    pub fn clear_boxes(&mut self) {
        self.boxes.clear();
    }

    /// YOLO label text: `class cx cy w h` per box, normalized to the image size.
    pub fn export_yolo(&self) -> String {
        let size = match self.image {
            Some(size) if !size.is_empty() => size,
            _ => return String::new(),
        };
        let (w, h) = (size.width as f64, size.height as f64);

        self.boxes
            .iter()
            .map(|b| {
                let center = b.rect.center();
                format!(
                    "{} {:.6} {:.6} {:.6} {:.6}",
                    b.class_id,
                    center.x / w,
                    center.y / h,
                    b.rect.width() / w,
                    b.rect.height() / h
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Label text ready for upload, or the reason it cannot be uploaded yet.
    pub fn prepare_upload(&self) -> Result<String, AnnotationError> {
        if self.image.is_none() {
            return Err(AnnotationError::NoImage);
        }
        let labels = self.export_yolo();
        if labels.trim().is_empty() {
            return Err(AnnotationError::NoBoxes);
        }
        Ok(labels)
    }

    pub fn scene(&self) -> Option<Scene> {
        let mut scene = Scene::new(self.image?);
        for b in &self.boxes {
            let label = match self.catalog.name_of(b.class_id) {
                Some(name) => name.to_string(),
                None => b.class_id.to_string(),
            };
            scene.push_box(b.rect, ANNOTATION_STROKE, None, label, LabelPlacement::Flush);
        }
        if let Some(rect) = self.pending_rect() {
            scene.push_pending(rect);
        }
        Some(scene)
    }
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self::new(ClassCatalog::default(), "airplane", DEFAULT_MIN_BOX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DrawOp;

    fn session_with_image(width: u32, height: u32) -> AnnotationSession {
        let mut session = AnnotationSession::default();
        session.set_image_size(ImageSize::new(width, height));
        session
    }

    fn drag(session: &mut AnnotationSession, from: (f64, f64), to: (f64, f64)) -> Option<AnnotationBox> {
        session.begin_box(Point::new(from.0, from.1)).unwrap();
        session.update_box(Point::new(to.0, to.1)).unwrap();
        session.commit_box().unwrap()
    }

    #[test]
    fn reverse_drag_is_normalized() {
        let mut session = session_with_image(400, 400);
        let stored = drag(&mut session, (50.0, 50.0), (10.0, 10.0)).unwrap();
        assert_eq!(stored.rect, Rect { x1: 10.0, y1: 10.0, x2: 50.0, y2: 50.0 });
        assert_eq!(stored.class_id, 2);
        assert!(!session.is_drawing());
    }

    #[test]
    fn tiny_boxes_are_discarded() {
        let mut session = session_with_image(400, 400);
        assert_eq!(drag(&mut session, (10.0, 10.0), (13.0, 13.0)), None);
        assert_eq!(drag(&mut session, (10.0, 10.0), (100.0, 14.0)), None);
        assert!(session.boxes().is_empty());
        assert!(!session.is_drawing());
    }

    #[test]
    fn export_matches_yolo_format() {
        let mut session = session_with_image(400, 400);
        session.select_class("airplane");
        drag(&mut session, (100.0, 100.0), (200.0, 300.0));
        assert_eq!(session.export_yolo(), "2 0.375000 0.500000 0.250000 0.500000");
    }

    #[test]
    fn export_joins_lines() {
        let mut session = session_with_image(100, 50);
        assert!(session.select_class("person"));
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        assert!(session.select_class("car"));
        drag(&mut session, (50.0, 0.0), (100.0, 25.0));
        assert_eq!(
            session.export_yolo(),
            "0 0.250000 0.500000 0.500000 1.000000\n1 0.750000 0.250000 0.500000 0.500000"
        );
    }

    #[test]
    fn export_without_image_is_empty() {
        let session = AnnotationSession::default();
        assert_eq!(session.export_yolo(), "");
        let zero = session_with_image(0, 10);
        assert_eq!(zero.export_yolo(), "");
    }

    #[test]
    fn begin_while_drawing_is_rejected() {
        let mut session = session_with_image(100, 100);
        session.begin_box(Point::new(1.0, 1.0)).unwrap();
        session.update_box(Point::new(30.0, 30.0)).unwrap();
        assert!(matches!(
            session.begin_box(Point::new(90.0, 90.0)),
            Err(AnnotationError::AlreadyDrawing)
        ));
        assert_eq!(
            session.pending_rect(),
            Some(Rect { x1: 1.0, y1: 1.0, x2: 30.0, y2: 30.0 })
        );
    }

    #[test]
    fn update_and_commit_need_drawing() {
        let mut session = session_with_image(100, 100);
        assert!(matches!(
            session.update_box(Point::new(1.0, 1.0)),
            Err(AnnotationError::NotDrawing)
        ));
        assert!(matches!(session.commit_box(), Err(AnnotationError::NotDrawing)));
    }

    #[test]
    fn begin_without_image_is_rejected() {
        let mut session = AnnotationSession::default();
        assert!(matches!(
            session.begin_box(Point::new(1.0, 1.0)),
            Err(AnnotationError::NoImage)
        ));
    }

    #[test]
    fn new_image_resets_boxes() {
        let mut session = session_with_image(100, 100);
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.begin_box(Point::new(5.0, 5.0)).unwrap();
        session.set_image_size(ImageSize::new(200, 200));
        assert!(session.boxes().is_empty());
        assert!(!session.is_drawing());
    }

    #[test]
    fn pop_and_clear() {
        let mut session = session_with_image(100, 100);
        assert_eq!(session.remove_last_box(), None);
        session.clear_boxes();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        drag(&mut session, (10.0, 10.0), (60.0, 60.0));
        let popped = session.remove_last_box().unwrap();
        assert_eq!(popped.rect.x1, 10.0);
        assert_eq!(session.boxes().len(), 1);
        session.clear_boxes();
        assert!(session.boxes().is_empty());
    }

    #[test]
    fn unknown_class_falls_back() {
        let mut session =
            AnnotationSession::new(ClassCatalog::from_names(["cat", "dog"]), "zebra", 5.0);
        assert!(!session.select_class("horse"));
        assert_eq!(session.selected_class_id(), ClassCatalog::FALLBACK_ID);
        session.set_image_size(ImageSize::new(10, 10));
        session.begin_box(Point::new(0.0, 0.0)).unwrap();
        session.update_box(Point::new(9.0, 9.0)).unwrap();
        assert_eq!(session.commit_box().unwrap().unwrap().class_id, 2);
    }

    #[test]
    fn prepare_upload_checks_input() {
        let mut session = AnnotationSession::default();
        assert!(matches!(session.prepare_upload(), Err(AnnotationError::NoImage)));
        session.set_image_size(ImageSize::new(400, 400));
        assert!(matches!(session.prepare_upload(), Err(AnnotationError::NoBoxes)));
        drag(&mut session, (100.0, 100.0), (200.0, 300.0));
        assert_eq!(
            session.prepare_upload().unwrap(),
            "2 0.375000 0.500000 0.250000 0.500000"
        );
    }

    #[test]
    fn scene_draws_boxes_then_pending() {
        let mut session = session_with_image(100, 100);
        session.select_class("car");
        drag(&mut session, (10.0, 30.0), (50.0, 60.0));
        session.begin_box(Point::new(70.0, 70.0)).unwrap();
        session.update_box(Point::new(90.0, 95.0)).unwrap();

        let scene = session.scene().unwrap();
        assert_eq!(scene.ops[0], DrawOp::Image(ImageSize::new(100, 100)));
        assert_eq!(scene.labels().collect::<Vec<_>>(), vec!["car"]);
        assert!(scene.ops.contains(&DrawOp::Label {
            x: 10.0,
            background_top: 12.0,
            baseline: 27.0,
            text: "car".into(),
        }));
        assert!(matches!(
            scene.ops.last(),
            Some(DrawOp::StrokeRect { dashed: true, .. })
        ));
    }

    #[test]
    fn manual_labels_are_trimmed() {
        assert_eq!(
            manual_label_text("  0 0.5 0.5 0.4 0.4 \n\n1 0.1 0.2 0.1 0.1\n").unwrap(),
            "0 0.5 0.5 0.4 0.4\n1 0.1 0.2 0.1 0.1"
        );
        assert_eq!(manual_label_text(SAMPLE_LABEL_TEXT).unwrap(), SAMPLE_LABEL_TEXT);
        assert!(matches!(manual_label_text(" \n  "), Err(AnnotationError::EmptyLabels)));
    }

    #[test]
    fn scene_needs_image() {
        assert!(AnnotationSession::default().scene().is_none());
    }

    #[test]
    fn load_image_reads_dimensions() {
        let img = image::RgbImage::new(7, 3);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let mut session = AnnotationSession::default();
        assert_eq!(session.load_image(&bytes).unwrap(), ImageSize::new(7, 3));
        assert_eq!(session.image_size(), Some(ImageSize::new(7, 3)));
    }

    // 16x8 baseline JPEG with an APP1 block saying "rotate 90 degrees clockwise"
    fn rotated_jpeg() -> Vec<u8> {
        let img = image::RgbImage::new(16, 8);
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        #[rustfmt::skip]
        let app1: [u8; 36] = [
            0xFF, 0xE1, 0x00, 0x22,
            b'E', b'x', b'i', b'f', 0x00, 0x00,
            b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08,
            0x00, 0x01,
            0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        let mut bytes = jpeg[..2].to_vec();
        bytes.extend_from_slice(&app1);
        bytes.extend_from_slice(&jpeg[2..]);
        bytes
    }

    #[test]
    fn exif_rotation_swaps_axes() {
        let bytes = rotated_jpeg();
        assert_eq!(image_dimensions(&bytes).unwrap(), ImageSize::new(8, 16));

        let mut session = AnnotationSession::default();
        session.load_image(&bytes).unwrap();
        // full-frame box in the rotated, portrait view
        drag(&mut session, (0.0, 0.0), (8.0, 16.0));
        assert_eq!(session.export_yolo(), "2 0.500000 0.500000 1.000000 1.000000");
    }

    #[test]
    fn adopting_size_keeps_drawn_boxes() {
        let mut session = AnnotationSession::default();
        assert!(session.adopt_image_size(ImageSize::new(100, 100)));
        drag(&mut session, (10.0, 10.0), (60.0, 60.0));

        assert!(!session.adopt_image_size(ImageSize::new(100, 100)));
        assert!(!session.adopt_image_size(ImageSize::new(80, 120)));
        assert_eq!(session.boxes().len(), 1);
        assert_eq!(session.image_size(), Some(ImageSize::new(100, 100)));
    }

    #[test]
    fn load_garbage_clears_session() {
        let mut session = session_with_image(100, 100);
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        assert!(session.load_image(b"definitely not an image").is_err());
        assert!(session.boxes().is_empty());
        assert_eq!(session.image_size(), None);
    }
}
