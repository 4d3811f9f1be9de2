use super::data::{EntryId, ImageEntry, Payload, Position, SavedImage, Size, DEFAULT_POSITION};

/// The Scene holds every placed image.
///
/// Two orders live side by side and are never conflated:
/// - interaction order: the storage order of `entries`. Newly added and
///   freshly grabbed entries sit at the end. Hit-testing walks it backwards.
/// - draw order: ascending `layer`. Rendering only ever uses this one.
#[derive(Debug, Default)]
pub struct Scene {
    entries: Vec<ImageEntry>,
    next_id: u64,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&ImageEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn get_mut(&mut self, id: EntryId) -> Option<&mut ImageEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn allocate_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId(self.next_id)
    }

    /// Add an image at the default position (100, 100)
    pub fn add_image(&mut self, src: Payload, width: u32, height: u32) -> EntryId {
        self.add_image_at(src, width, height, DEFAULT_POSITION)
    }

    /// Add an image at `position`.
    ///
    /// The new entry gets `layer = entry count + 1`, which puts it above
    /// every image present at insertion time. Zero-sized images are
    /// accepted as-is.
    pub fn add_image_at(&mut self, src: Payload, width: u32, height: u32, position: Position) -> EntryId {
        let id = self.allocate_id();
        let layer = self.entries.len() as u64 + 1;
        self.entries.push(ImageEntry {
            id,
            src,
            position,
            size: Size { width, height },
            layer,
            is_dragging: false,
            drag_offset: Position::default(),
            rest_offset: Position::default(),
        });
        id
    }

    /// Move the entry to the end of the interaction order.
    ///
    /// `layer` is left untouched, so this alone never changes what is drawn on top.
    pub fn reorder_to_front(&mut self, id: EntryId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                let entry = self.entries.remove(index);
                self.entries.push(entry);
                true
            }
            None => false,
        }
    }

    /// Raise the entry's `layer` above every other entry
    pub fn promote(&mut self, id: EntryId) -> bool {
        let others_top = self
            .entries
            .iter()
            .filter(|entry| entry.id != id)
            .map(|entry| entry.layer)
            .max()
            .unwrap_or(0);
        match self.get_mut(id) {
            Some(entry) => {
                if entry.layer <= others_top {
                    entry.layer = others_top + 1;
                }
                true
            }
            None => false,
        }
    }

    /// Overwrite the entry's top-left corner. No clamping: entries may
    /// leave the visible surface entirely.
    pub fn move_entry(&mut self, id: EntryId, x: f64, y: f64) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.position = Position::new(x, y);
                true
            }
            None => false,
        }
    }

    /// Most recently interacted entry whose box contains the point
    pub fn hit_test(&self, x: f64, y: f64) -> Option<EntryId> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.contains(x, y))
            .map(|entry| entry.id)
    }

    /// Entries oldest interaction first (storage order)
    pub fn interaction_order(&self) -> impl DoubleEndedIterator<Item = &ImageEntry> + '_ {
        self.entries.iter()
    }

    /// Entries back to front. Equal layers keep their interaction order.
    pub fn draw_order(&self) -> Vec<&ImageEntry> {
        let mut ordered: Vec<&ImageEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.layer);
        ordered
    }

    /// The entry currently flagged as the drag target, if any
    pub fn dragging(&self) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|entry| entry.is_dragging)
            .map(|entry| entry.id)
    }

    /// Flag the entry as the drag target and remember where it was grabbed.
    ///
    /// Any other entry still carrying the flag loses it, so at most one
    /// entry is ever being dragged.
    pub fn begin_drag(&mut self, id: EntryId, pointer: Position) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        for entry in &mut self.entries {
            if entry.id == id {
                entry.is_dragging = true;
                entry.drag_offset = Position::new(
                    pointer.x - entry.position.x,
                    pointer.y - entry.position.y,
                );
                entry.rest_offset = entry.drag_offset;
            } else {
                entry.is_dragging = false;
            }
        }
        true
    }

    /// Place the dragged entry so the grab point stays under the pointer
    pub fn drag_to(&mut self, id: EntryId, pointer: Position) -> bool {
        match self.get_mut(id) {
            Some(entry) if entry.is_dragging => {
                entry.position = Position::new(
                    pointer.x - entry.drag_offset.x,
                    pointer.y - entry.drag_offset.y,
                );
                true
            }
            _ => false,
        }
    }

    pub fn end_drag(&mut self, id: EntryId) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.is_dragging = false;
                true
            }
            None => false,
        }
    }

    /// Every payload referenced by the scene, in interaction order
    pub fn payloads(&self) -> impl Iterator<Item = &Payload> + '_ {
        self.entries.iter().map(|entry| &entry.src)
    }

    /// Snapshot of the whole scene as a JSON array, in interaction order.
    ///
    /// Drag state is written at rest, so a saved scene never looks
    /// mid-gesture.
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        let saved: Vec<SavedImage<'_>> = self.entries.iter().map(SavedImage::from_entry).collect();
        serde_json::to_vec(&saved)
    }

    /// Rebuild a scene from its saved form.
    ///
    /// Malformed input yields an empty scene: a broken save is treated
    /// the same as no previous session.
    pub fn deserialize(bytes: &[u8]) -> Scene {
        match serde_json::from_slice::<Vec<SavedImage<'_>>>(bytes) {
            Ok(saved) => {
                let mut scene = Scene::new();
                for image in saved {
                    let id = scene.allocate_id();
                    scene.entries.push(image.into_entry(id));
                }
                scene
            }
            Err(e) => {
                log::warn!("⚠️  Discarding malformed saved scene: {}", e);
                Scene::new()
            }
        }
    }
}
