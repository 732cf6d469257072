use iced::mouse;
use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::{Point, Rectangle, Renderer, Size, Theme};

use facestamp_core::overlay::infrastructure::overlay_scene::Scene;
use facestamp_core::shared::bounding_box::BoundingBox;

use crate::theme::OverlayColors;

const BOX_WIDTH: f32 = 2.0;
const LABEL_SIZE: f32 = 14.0;
const LABEL_PADDING: f32 = 4.0;

/// Draws the presented overlay scene: one stroked box and label per face.
pub struct OverlayCanvas {
    scene: Scene,
}

impl OverlayCanvas {
    pub fn new(scene: Scene) -> Self {
        Self { scene }
    }
}

impl<Message> canvas::Program<Message> for OverlayCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let colors = OverlayColors::from_theme(theme);

        for labeled in &self.scene.boxes {
            let rect = to_canvas(&labeled.bbox, &self.scene, bounds.size());
            let color = if labeled.known {
                colors.known
            } else {
                colors.unknown
            };

            frame.stroke(
                &Path::rectangle(rect.position(), rect.size()),
                Stroke::default().with_color(color).with_width(BOX_WIDTH),
            );
            frame.fill_text(Text {
                content: labeled.label.clone(),
                position: label_position(&rect),
                color,
                size: LABEL_SIZE.into(),
                ..Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}

/// Maps a box in scene coordinates onto a canvas of `canvas` size.
fn to_canvas(bbox: &BoundingBox, scene: &Scene, canvas: Size) -> Rectangle {
    let sx = if scene.size.width == 0 {
        1.0
    } else {
        canvas.width / scene.size.width as f32
    };
    let sy = if scene.size.height == 0 {
        1.0
    } else {
        canvas.height / scene.size.height as f32
    };
    Rectangle::new(
        Point::new(bbox.x as f32 * sx, bbox.y as f32 * sy),
        Size::new(bbox.width as f32 * sx, bbox.height as f32 * sy),
    )
}

/// Above the box, or inside its top edge when the box touches the top.
fn label_position(rect: &Rectangle) -> Point {
    let above = rect.y - LABEL_SIZE - LABEL_PADDING;
    if above >= 0.0 {
        Point::new(rect.x, above)
    } else {
        Point::new(rect.x + LABEL_PADDING, rect.y + LABEL_PADDING)
    }
}
