use iced::widget::canvas::Frame;
use iced::{Color, Point, Rectangle};

use super::cache::DecodeCache;
use super::decode::DecodedImage;
use crate::state::Scene;

/// Board background, painted by `clear`
pub const BOARD_BACKGROUND: Color = Color {
    r: 0.12,
    g: 0.12,
    b: 0.14,
    a: 1.0,
};

/// A 2D raster drawing target. Never read back from.
pub trait Surface {
    fn clear(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn draw_image(&mut self, image: &DecodedImage, x: f32, y: f32, width: f32, height: f32);
}

/// [`Surface`] over an iced canvas frame
pub struct FrameSurface<'a> {
    frame: &'a mut Frame,
}

impl<'a> FrameSurface<'a> {
    pub fn new(frame: &'a mut Frame) -> Self {
        Self { frame }
    }
}

impl Surface for FrameSurface<'_> {
    fn clear(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.frame.fill_rectangle(
            Point::new(x, y),
            iced::Size::new(width, height),
            BOARD_BACKGROUND,
        );
    }

    fn draw_image(&mut self, image: &DecodedImage, x: f32, y: f32, width: f32, height: f32) {
        let bounds = Rectangle::new(Point::new(x, y), iced::Size::new(width, height));
        self.frame.draw_image(bounds, &image.handle);
    }
}

/// Full render pass: clear the surface, then draw every decoded entry
/// back to front by `layer`.
///
/// All draws are issued synchronously from already decoded pixels, so
/// the result always respects layer order. Entries whose payload failed
/// to decode (or is still pending) are skipped.
pub fn compose<S: Surface>(scene: &Scene, decodes: &DecodeCache, surface: &mut S, bounds: iced::Size) {
    surface.clear(0.0, 0.0, bounds.width, bounds.height);

    for entry in scene.draw_order() {
        let Some(image) = decodes.get(entry.src.key()) else {
            continue;
        };
        surface.draw_image(
            image,
            entry.position.x as f32,
            entry.position.y as f32,
            entry.size.width as f32,
            entry.size.height as f32,
        );
    }
}
