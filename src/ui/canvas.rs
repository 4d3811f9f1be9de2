use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Program};
use iced::{Point, Rectangle, Renderer, Theme};

use crate::app::Message;
use crate::render::{compose, DecodeCache, FrameSurface};
use crate::state::{PointerEvent, Position, Scene};

/// Canvas program drawing the scene and reporting pointer events
pub struct SceneCanvas<'a> {
    pub scene: &'a Scene,
    pub decodes: &'a DecodeCache,
    /// Last composited frame; only cleared once every decode has resolved
    pub frame: &'a canvas::Cache,
    /// An image is being dragged
    pub dragging: bool,
}

impl Program<Message> for SceneCanvas<'_> {
    type State = PointerState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let geometry = self.frame.draw(renderer, bounds.size(), |frame| {
            let mut surface = FrameSurface::new(frame);
            compose(self.scene, self.decodes, &mut surface, bounds.size());
        });

        vec![geometry]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    state.enter(pos);
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pointer(PointerEvent::Down(to_scene(pos)))),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    state.enter(pos);
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pointer(PointerEvent::Up(to_scene(pos)))),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    state.enter(pos);
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pointer(PointerEvent::Move(to_scene(pos)))),
                    );
                }
                if let Some(last) = state.leave() {
                    return (
                        canvas::event::Status::Ignored,
                        Some(Message::Pointer(PointerEvent::Leave(to_scene(last)))),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorLeft) => {
                if let Some(last) = state.leave() {
                    return (
                        canvas::event::Status::Ignored,
                        Some(Message::Pointer(PointerEvent::Leave(to_scene(last)))),
                    );
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        let over_image = cursor
            .position_in(bounds)
            .is_some_and(|pos| self.scene.hit_test(f64::from(pos.x), f64::from(pos.y)).is_some());
        cursor_for(self.dragging, over_image)
    }
}

fn cursor_for(dragging: bool, over_image: bool) -> mouse::Interaction {
    if dragging {
        mouse::Interaction::Grabbing
    } else if over_image {
        mouse::Interaction::Grab
    } else {
        mouse::Interaction::default()
    }
}

fn to_scene(point: Point) -> Position {
    Position::new(f64::from(point.x), f64::from(point.y))
}

/// Tracks whether the pointer is over the canvas, so leaving is reported once
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    pub last_position: Option<Point>,
}

impl PointerState {
    fn enter(&mut self, pos: Point) {
        self.last_position = Some(pos);
    }

    /// Returns the last known position the first time the pointer leaves
    fn leave(&mut self) -> Option<Point> {
        self.last_position.take()
    }
}
