/// Pointer gesture state machine
///
/// Turns down / move / up / leave events into scene mutations:
/// - down on an image grabs it (drag offset, reorder to front, save)
/// - move drags the grabbed image (redraw only, no save)
/// - up or leave drops it (save)

use super::data::{EntryId, Position};
use super::scene::Scene;
use super::store::{KeyValueStore, SceneStore};

/// A pointer event in surface-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Position),
    Move(Position),
    Up(Position),
    Leave(Position),
}

/// Where the current gesture stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging(EntryId),
}

/// What the caller has to do after an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Response {
    /// Scene changed visibly, a render pass is needed
    pub redraw: bool,
    /// Outcome of the save this event triggered, `None` when nothing was saved
    pub committed: Option<bool>,
}

impl Response {
    const NONE: Response = Response {
        redraw: false,
        committed: None,
    };
}

#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Gesture,
    /// Also raise `layer` of the grabbed image, not just its interaction order
    promote_on_select: bool,
}

impl InteractionController {
    pub fn new(promote_on_select: bool) -> Self {
        Self {
            gesture: Gesture::Idle,
            promote_on_select,
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// The entry engaged by the gesture in progress
    pub fn selection(&self) -> Option<EntryId> {
        match self.gesture {
            Gesture::Idle => None,
            Gesture::Dragging(id) => Some(id),
        }
    }

    /// Dispatch any pointer event
    pub fn handle<S: KeyValueStore>(
        &mut self,
        event: PointerEvent,
        scene: &mut Scene,
        store: &mut SceneStore<S>,
    ) -> Response {
        match event {
            PointerEvent::Down(at) => self.on_pointer_down(scene, store, at),
            PointerEvent::Move(at) => self.on_pointer_move(scene, at),
            PointerEvent::Up(_) => self.on_pointer_up(scene, store),
            PointerEvent::Leave(_) => self.on_pointer_leave(scene, store),
        }
    }

    pub fn on_pointer_down<S: KeyValueStore>(
        &mut self,
        scene: &mut Scene,
        store: &mut SceneStore<S>,
        at: Position,
    ) -> Response {
        // One gesture at a time
        if self.gesture != Gesture::Idle {
            return Response::NONE;
        }

        let Some(id) = scene.hit_test(at.x, at.y) else {
            return Response::NONE;
        };

        scene.begin_drag(id, at);
        scene.reorder_to_front(id);
        if self.promote_on_select {
            scene.promote(id);
        }
        let committed = Some(store.flush(scene));

        log::debug!("Grabbed {:?} at ({}, {})", id, at.x, at.y);
        self.gesture = Gesture::Dragging(id);

        Response {
            redraw: self.promote_on_select,
            committed,
        }
    }

    pub fn on_pointer_move(&mut self, scene: &mut Scene, at: Position) -> Response {
        let Gesture::Dragging(id) = self.gesture else {
            return Response::NONE;
        };

        if scene.drag_to(id, at) {
            Response {
                redraw: true,
                committed: None,
            }
        } else {
            // Target vanished under us; drop the gesture
            self.gesture = Gesture::Idle;
            Response::NONE
        }
    }

    pub fn on_pointer_up<S: KeyValueStore>(
        &mut self,
        scene: &mut Scene,
        store: &mut SceneStore<S>,
    ) -> Response {
        let Gesture::Dragging(id) = self.gesture else {
            return Response::NONE;
        };

        scene.end_drag(id);
        self.gesture = Gesture::Idle;
        let committed = Some(store.flush(scene));
        log::debug!("Released {:?}", id);

        Response {
            redraw: false,
            committed,
        }
    }

    /// Leaving the surface ends the gesture exactly like a release
    pub fn on_pointer_leave<S: KeyValueStore>(
        &mut self,
        scene: &mut Scene,
        store: &mut SceneStore<S>,
    ) -> Response {
        self.on_pointer_up(scene, store)
    }
}
