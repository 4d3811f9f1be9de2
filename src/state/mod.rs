/// State management module
///
/// This module handles all scene state, including:
/// - Shared data structures (data.rs)
/// - The scene model: add, reorder, drag, (de)serialize (scene.rs)
/// - The pointer gesture state machine (interaction.rs)
/// - The key-value persistence store (store.rs)

pub mod data;
pub mod interaction;
pub mod scene;
pub mod store;

pub use data::{EntryId, ImageEntry, Payload, PayloadKey, Position};
pub use interaction::{Gesture, InteractionController, PointerEvent, Response};
pub use scene::Scene;
pub use store::{KeyValueStore, MemoryStore, SceneStore, SqliteStore, StoreError};
