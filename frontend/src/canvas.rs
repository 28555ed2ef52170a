use shared::render::{DrawOp, FONT, LABEL_BACKGROUND, LABEL_HEIGHT, LABEL_PADDING, LABEL_TEXT, LINE_WIDTH, PENDING_DASH};
use shared::{CanvasMetrics, Point, Scene};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent};

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

/// Replays a scene onto the canvas, drawing `image` for the base layer.
pub fn paint(canvas: &HtmlCanvasElement, image: &HtmlImageElement, scene: &Scene) -> Result<(), JsValue> {
    let ctx = context_2d(canvas)?;

    for op in &scene.ops {
        match op {
            DrawOp::Image(size) => {
                // resizing the buffer resets the context state
                canvas.set_width(size.width);
                canvas.set_height(size.height);
                ctx.clear_rect(0.0, 0.0, size.width as f64, size.height as f64);
                // stretch to the scene size so boxes and pixels share one coordinate space
                ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    image,
                    0.0,
                    0.0,
                    size.width as f64,
                    size.height as f64,
                )?;
                ctx.set_line_width(LINE_WIDTH);
                ctx.set_font(FONT);
            }
            DrawOp::StrokeRect { rect, color, dashed } => {
                ctx.set_stroke_style_str(color);
                if *dashed {
                    let dash = js_sys::Array::of2(&PENDING_DASH[0].into(), &PENDING_DASH[1].into());
                    ctx.set_line_dash(&dash)?;
                }
                ctx.stroke_rect(rect.x1, rect.y1, rect.width(), rect.height());
                if *dashed {
                    ctx.set_line_dash(&js_sys::Array::new())?;
                }
            }
            DrawOp::FillRect { rect, color } => {
                ctx.set_fill_style_str(color);
                ctx.fill_rect(rect.x1, rect.y1, rect.width(), rect.height());
            }
            DrawOp::Label { x, background_top, baseline, text } => {
                let text_width = ctx.measure_text(text)?.width();
                ctx.set_fill_style_str(LABEL_BACKGROUND);
                ctx.fill_rect(*x, *background_top, text_width + 2.0 * LABEL_PADDING, LABEL_HEIGHT);
                ctx.set_fill_style_str(LABEL_TEXT);
                ctx.fill_text(text, x + LABEL_PADDING, *baseline)?;
            }
        }
    }
    Ok(())
}

pub fn metrics(canvas: &HtmlCanvasElement) -> CanvasMetrics {
    let rect = canvas.get_bounding_client_rect();
    CanvasMetrics {
        pixel_width: canvas.width() as f64,
        pixel_height: canvas.height() as f64,
        left: rect.left(),
        top: rect.top(),
        displayed_width: rect.width(),
        displayed_height: rect.height(),
    }
}

/// Pointer position in image pixels.
pub fn pointer_position(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Point {
    metrics(canvas).to_image_point(event.client_x() as f64, event.client_y() as f64)
}
