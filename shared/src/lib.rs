//! Core of the detection studio client: progress log reduction, the
//! annotation engine, detection overlays and the service wire types.
//!
//! Nothing in here touches the DOM, so it builds and tests natively.

pub mod annotation;
pub mod api;
pub mod config;
pub mod error;
pub mod geometry;
pub mod overlay;
pub mod progress;
pub mod render;

pub use annotation::{AnnotationBox, AnnotationSession, ClassCatalog};
pub use api::{ActionResult, Detection, Endpoint, PredictItem, PredictMultiResponse};
pub use config::ClientConfig;
pub use error::{AnnotationError, ConfigError};
pub use geometry::{CanvasMetrics, ImageSize, Point, Rect};
pub use progress::{ProgressSnapshot, ProgressStatus};
pub use render::{DrawOp, Scene};
