//! Detection boxes drawn over a predicted image.

use crate::api::PredictItem;
use crate::geometry::{ImageSize, Rect, Scale};
use crate::render::{DETECTION_FILL, DETECTION_STROKE, LabelPlacement, Scene};

/// Scale from the space the backend ran inference in to the displayed image.
///
/// A missing inference dimension means the backend did not resize that axis.
pub fn inference_scale(displayed: ImageSize, inference_w: Option<f64>, inference_h: Option<f64>) -> Scale {
    let (dw, dh) = (displayed.width as f64, displayed.height as f64);
    Scale::between(
        (inference_w.unwrap_or(dw), inference_h.unwrap_or(dh)),
        (dw, dh),
    )
}

pub fn render(displayed: ImageSize, result: Option<&PredictItem>) -> Scene {
    let mut scene = Scene::new(displayed);

    let result = match result {
        Some(r) if r.ok && !r.detections().is_empty() => r,
        _ => return scene,
    };

    let scale = inference_scale(displayed, result.image_w, result.image_h);
    for detection in result.detections() {
        let rect = Rect::from_xyxy(detection.xyxy).scaled(scale);
        scene.push_box(
            rect,
            DETECTION_STROKE,
            Some(DETECTION_FILL),
            detection.caption(),
            LabelPlacement::Raised,
        );
    }
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Detection;
    use crate::render::DrawOp;

    fn item(image_w: Option<f64>, image_h: Option<f64>) -> PredictItem {
        PredictItem {
            ok: true,
            image_w,
            image_h,
            detections: Some(vec![Detection {
                xyxy: [10.0, 20.0, 30.0, 40.0],
                score: 0.9234,
                label: "person".into(),
            }]),
            ..Default::default()
        }
    }

    fn first_rect(scene: &Scene) -> Rect {
        scene
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::StrokeRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn boxes_rescaled_to_display() {
        let scene = render(ImageSize::new(1280, 480), Some(&item(Some(640.0), Some(480.0))));
        assert_eq!(first_rect(&scene), Rect { x1: 20.0, y1: 20.0, x2: 60.0, y2: 40.0 });
        assert_eq!(scene.labels().collect::<Vec<_>>(), vec!["person 92.3%"]);
    }

    #[test]
    fn missing_inference_size_means_no_resize() {
        let scene = render(ImageSize::new(200, 100), Some(&item(None, None)));
        assert_eq!(first_rect(&scene), Rect { x1: 10.0, y1: 20.0, x2: 30.0, y2: 40.0 });
    }

    #[test]
    fn failed_or_empty_results_draw_image_only() {
        let size = ImageSize::new(100, 100);
        assert!(render(size, None).is_bare());

        let mut failed = item(None, None);
        failed.ok = false;
        assert!(render(size, Some(&failed)).is_bare());

        let empty = PredictItem {
            ok: true,
            detections: Some(vec![]),
            ..Default::default()
        };
        assert!(render(size, Some(&empty)).is_bare());
    }

    #[test]
    fn detections_are_filled() {
        let scene = render(ImageSize::new(100, 100), Some(&item(None, None)));
        assert!(scene
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::FillRect { color, .. } if *color == DETECTION_FILL)));
    }
}
