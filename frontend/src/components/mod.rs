pub mod annotate_panel;
pub mod handlers;
pub mod header;
pub mod logs_panel;
pub mod predict_panel;
pub mod retrain_panel;
pub mod theme_toggle;
pub mod utils;
