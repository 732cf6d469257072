pub mod image_overlay;
pub mod overlay_scene;
