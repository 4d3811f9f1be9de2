use iced::widget::{button, canvas, column, row, text};
use iced::{alignment, Element, Length, Task, Theme};
use rfd::FileDialog;

use crate::acquire;
use crate::config::{self, Config};
use crate::render::{decode_batch, DecodeCache, DecodeOutcome};
use crate::state::{InteractionController, Payload, PointerEvent, Scene, SceneStore, SqliteStore};
use crate::ui;

/// Main application state
pub struct Pinboard {
    /// Every placed image
    scene: Scene,
    /// Where the scene is saved after each committed change
    store: SceneStore<SqliteStore>,
    /// Pointer gesture state machine
    controller: InteractionController,
    /// Decoded pixels, keyed by payload content
    decodes: DecodeCache,
    /// Last composited frame of the board
    frame: canvas::Cache,
    /// Added payloads waiting on a decode that was already in flight
    awaiting: Vec<Payload>,
    /// Whether the last save reached the store
    saved: bool,
    config: Config,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked the "Add Image" button
    AddImage,
    /// Chosen file has been read (None: empty or unreadable)
    PayloadRead(Option<Payload>),
    /// A freshly added payload finished decoding
    ImageDecoded(Payload, Vec<DecodeOutcome>),
    /// A batch of scene decodes finished
    DecodesResolved(Vec<DecodeOutcome>),
    /// Pointer activity on the board
    Pointer(PointerEvent),
}

impl Pinboard {
    /// Create a new instance of the application
    pub fn new() -> (Self, Task<Message>) {
        let config = config::load().unwrap_or_else(|e| {
            log::warn!("⚠️  Could not load settings, using defaults: {}", e);
            Config::default()
        });

        let store = open_store(&config);
        let mut app = Self::with_store(config, store);
        if app.store.inner().path().is_none() {
            app.saved = false;
            app.refresh_status();
        }

        let task = app.request_render();
        (app, task)
    }

    /// Build the app around an already opened store
    pub fn with_store(config: Config, store: SceneStore<SqliteStore>) -> Self {
        let scene = store.init();
        let controller = InteractionController::new(config.promote_on_select);

        let mut app = Pinboard {
            scene,
            store,
            controller,
            decodes: DecodeCache::new(),
            frame: canvas::Cache::new(),
            awaiting: Vec::new(),
            saved: true,
            config,
            status: String::new(),
        };
        app.refresh_status();
        app
    }

    /// Handle application messages and update state
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::AddImage => {
                let file = FileDialog::new()
                    .set_title("Add Image")
                    .add_filter("Images", &acquire::IMAGE_EXTENSIONS)
                    .pick_file();

                match file {
                    Some(path) => Task::perform(acquire::read_payload(path), Message::PayloadRead),
                    None => Task::none(),
                }
            }
            Message::PayloadRead(None) => Task::none(),
            Message::PayloadRead(Some(payload)) => {
                if let Some(image) = self.decodes.get(payload.key()).cloned() {
                    self.place(payload, image.width, image.height);
                    return self.request_render();
                }
                if self.decodes.is_failed(payload.key()) {
                    log::warn!("⚠️  Not an image, ignoring {}", payload.key());
                    return Task::none();
                }

                // Claim so a render pass does not decode the same payload again
                if !self.decodes.claim(&payload) {
                    log::debug!("Decode of {} already running, placing when done", payload.key());
                    self.awaiting.push(payload);
                    return Task::none();
                }
                let batch = vec![payload.clone()];
                Task::perform(decode_batch(batch), move |outcomes| {
                    Message::ImageDecoded(payload.clone(), outcomes)
                })
            }
            Message::ImageDecoded(payload, outcomes) => {
                self.decodes.resolve(outcomes);
                self.place_awaiting();
                match self.decodes.get(payload.key()).cloned() {
                    Some(image) => {
                        self.place(payload, image.width, image.height);
                        self.request_render()
                    }
                    None => {
                        // Undecodable files never make it onto the board
                        log::warn!("⚠️  Not an image, ignoring {}", payload.key());
                        self.request_render()
                    }
                }
            }
            Message::DecodesResolved(outcomes) => {
                self.decodes.resolve(outcomes);
                self.place_awaiting();
                self.request_render()
            }
            Message::Pointer(event) => {
                let response = self.controller.handle(event, &mut self.scene, &mut self.store);
                if let Some(saved) = response.committed {
                    self.set_saved(saved);
                }
                if response.redraw {
                    return self.request_render();
                }
                Task::none()
            }
        }
    }

    /// Build the user interface
    pub fn view(&self) -> Element<'_, Message> {
        let toolbar = row![
            button("Add Image")
                .on_press(Message::AddImage)
                .padding(10),
            text(&self.status).size(16),
        ]
        .spacing(20)
        .align_y(alignment::Vertical::Center);

        let board = canvas(ui::SceneCanvas {
            scene: &self.scene,
            decodes: &self.decodes,
            frame: &self.frame,
            dragging: self.controller.selection().is_some(),
        })
        .width(Length::Fill)
        .height(Length::Fill);

        column![toolbar, board].spacing(10).padding(20).into()
    }

    /// Set the application theme
    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    /// Add a decoded image to the scene and save it
    fn place(&mut self, payload: Payload, width: u32, height: u32) {
        let id = self
            .scene
            .add_image_at(payload, width, height, self.config.default_position());
        self.saved = self.store.flush(&self.scene);
        self.refresh_status();
        log::info!("➕ Added image {:?} ({}x{})", id, width, height);
    }

    /// Place added payloads whose decode has come back; drop the undecodable ones
    fn place_awaiting(&mut self) {
        for payload in std::mem::take(&mut self.awaiting) {
            if let Some(image) = self.decodes.get(payload.key()).cloned() {
                self.place(payload, image.width, image.height);
            } else if self.decodes.is_pending(payload.key()) {
                self.awaiting.push(payload);
            } else {
                log::warn!("⚠️  Not an image, ignoring {}", payload.key());
            }
        }
    }

    fn set_saved(&mut self, saved: bool) {
        if self.saved != saved {
            self.saved = saved;
            self.refresh_status();
        }
    }

    /// Redraw once every decode the scene needs has resolved.
    ///
    /// Missing payloads are decoded first; the frame is left untouched
    /// until they are all back, so no partial composite is ever shown.
    fn request_render(&mut self) -> Task<Message> {
        let missing = self.decodes.request(&self.scene);
        if !missing.is_empty() {
            log::debug!(
                "Decoding {} images before next frame ({} known)",
                missing.len(),
                self.decodes.len()
            );
            return Task::perform(decode_batch(missing), Message::DecodesResolved);
        }

        if self.decodes.is_resolved(&self.scene) {
            self.frame.clear();
        }
        Task::none()
    }

    fn refresh_status(&mut self) {
        let mut status = match self.scene.len() {
            0 => "Board is empty. Add an image to get started.".to_string(),
            1 => "1 image on the board.".to_string(),
            n => format!("{} images on the board.", n),
        };
        if !self.saved {
            status.push_str(" ⚠️ Changes are not being saved.");
        }
        self.status = status;
    }
}

/// Open the configured store, falling back to an in-memory one so the
/// board stays usable (unsaved) when the database cannot be opened.
fn open_store(config: &Config) -> SceneStore<SqliteStore> {
    let opened = match &config.database_path {
        Some(path) => SqliteStore::open(path),
        None => SqliteStore::open_default(),
    };

    let store = opened.or_else(|e| {
        log::error!("❌ Could not open scene store, changes will not be saved: {}", e);
        SqliteStore::open_in_memory()
    });

    // If even in-memory SQLite fails we panic, the board cannot function without a store
    SceneStore::new(store.expect("Failed to create in-memory scene store"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::decode::{decode_payload, tests::png_payload};
    use crate::state::{Gesture, KeyValueStore, Position};
    use std::sync::Arc;

    fn app() -> Pinboard {
        let store = SceneStore::new(SqliteStore::open_in_memory().unwrap());
        Pinboard::with_store(Config::default(), store)
    }

    fn decoded(payload: &Payload) -> Vec<DecodeOutcome> {
        vec![DecodeOutcome {
            key: payload.key(),
            image: decode_payload(payload).ok().map(Arc::new),
        }]
    }

    fn saved_len(app: &Pinboard) -> usize {
        let bytes = app.store.inner().get(crate::state::store::SCENE_KEY).unwrap();
        bytes.map(|b| Scene::deserialize(&b).len()).unwrap_or(0)
    }

    #[test]
    fn test_decoded_image_is_placed_and_saved() {
        let mut app = app();
        let payload = png_payload(50, 40);

        let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));

        assert_eq!(app.scene.len(), 1);
        let entry = app.scene.interaction_order().next().unwrap();
        assert_eq!(entry.position, Position::new(100.0, 100.0));
        assert_eq!((entry.size.width, entry.size.height), (50, 40));
        assert_eq!(entry.layer, 1);
        assert_eq!(saved_len(&app), 1);
        assert_eq!(app.status, "1 image on the board.");
    }

    #[test]
    fn test_undecodable_payload_is_never_placed() {
        let mut app = app();
        let payload = Payload::new("data:application/octet-stream;base64,aGVsbG8=");

        let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));
        assert!(app.scene.is_empty());

        // Second attempt with the same bytes is dropped straight away
        let _ = app.update(Message::PayloadRead(Some(payload)));
        assert!(app.scene.is_empty());
        assert_eq!(saved_len(&app), 0);
    }

    #[test]
    fn test_already_decoded_payload_is_placed_immediately() {
        let mut app = app();
        let payload = png_payload(8, 8);
        let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));

        let _ = app.update(Message::PayloadRead(Some(payload)));
        assert_eq!(app.scene.len(), 2);
        assert_eq!(app.decodes.len(), 1);
    }

    #[test]
    fn test_empty_selection_is_a_noop() {
        let mut app = app();
        let _ = app.update(Message::PayloadRead(None));
        assert!(app.scene.is_empty());
    }

    #[test]
    fn test_pointer_gesture_drags_and_saves() {
        let mut app = app();
        let payload = png_payload(50, 50);
        let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));

        let _ = app.update(Message::Pointer(PointerEvent::Down(Position::new(110.0, 110.0))));
        assert!(matches!(app.controller.gesture(), Gesture::Dragging(_)));

        let _ = app.update(Message::Pointer(PointerEvent::Move(Position::new(200.0, 50.0))));
        let _ = app.update(Message::Pointer(PointerEvent::Up(Position::new(200.0, 50.0))));
        assert_eq!(app.controller.gesture(), Gesture::Idle);

        let bytes = app.store.inner().get(crate::state::store::SCENE_KEY).unwrap().unwrap();
        let saved = Scene::deserialize(&bytes);
        let entry = saved.interaction_order().next().unwrap();
        assert_eq!(entry.position, Position::new(190.0, 40.0));
    }

    #[test]
    fn test_restart_restores_saved_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");
        let payload = png_payload(5, 5);

        {
            let store = SceneStore::new(SqliteStore::open(&path).unwrap());
            let mut app = Pinboard::with_store(Config::default(), store);
            let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));
        }

        let store = SceneStore::new(SqliteStore::open(&path).unwrap());
        let app = Pinboard::with_store(Config::default(), store);
        assert_eq!(app.scene.len(), 1);
        assert_eq!(app.status, "1 image on the board.");
    }

    #[test]
    fn test_new_file_is_claimed_for_decoding() {
        let mut app = app();
        let payload = png_payload(4, 4);

        let _ = app.update(Message::PayloadRead(Some(payload.clone())));

        assert!(app.decodes.is_pending(payload.key()));
        assert!(app.scene.is_empty());
        assert!(app.awaiting.is_empty());
    }

    #[test]
    fn test_adding_file_already_decoding_for_scene_waits_for_that_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");
        let payload = png_payload(6, 6);
        {
            let store = SceneStore::new(SqliteStore::open(&path).unwrap());
            let mut app = Pinboard::with_store(Config::default(), store);
            let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));
        }

        let store = SceneStore::new(SqliteStore::open(&path).unwrap());
        let mut app = Pinboard::with_store(Config::default(), store);
        // Startup render dispatches the decode of the restored image
        let _ = app.request_render();
        assert!(app.decodes.is_pending(payload.key()));

        let _ = app.update(Message::PayloadRead(Some(payload.clone())));
        assert_eq!(app.scene.len(), 1);
        assert_eq!(app.awaiting.len(), 1);
        assert_eq!(app.decodes.len(), 1);

        let _ = app.update(Message::DecodesResolved(decoded(&payload)));
        assert!(app.awaiting.is_empty());
        assert_eq!(app.scene.len(), 2);
        assert_eq!(saved_len(&app), 2);
    }

    #[test]
    fn test_waiting_file_that_fails_to_decode_is_dropped() {
        let mut app = app();
        let payload = Payload::new("data:image/png;base64,AAAA");
        app.decodes.claim(&payload);

        let _ = app.update(Message::PayloadRead(Some(payload.clone())));
        assert_eq!(app.awaiting.len(), 1);

        let _ = app.update(Message::DecodesResolved(decoded(&payload)));
        assert!(app.awaiting.is_empty());
        assert!(app.scene.is_empty());
    }

    #[test]
    fn test_failed_save_shows_in_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");
        let store = SceneStore::new(SqliteStore::open(&path).unwrap());
        let mut app = Pinboard::with_store(Config::default(), store);
        let payload = png_payload(50, 50);
        let _ = app.update(Message::ImageDecoded(payload.clone(), decoded(&payload)));
        assert_eq!(app.status, "1 image on the board.");

        // Pull the table out from under the open store
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("DROP TABLE kv", [])
            .unwrap();

        let _ = app.update(Message::Pointer(PointerEvent::Down(Position::new(110.0, 110.0))));
        assert!(matches!(app.controller.gesture(), Gesture::Dragging(_)));
        assert_eq!(app.status, "1 image on the board. ⚠️ Changes are not being saved.");
    }
}
