/// Shared data structures for the scene
///
/// These structs represent the data model that flows between
/// the scene, the persistence layer and the renderer.
///
/// The saved form of an entry is a flat JSON object with the keys
/// `src, x, y, width, height, isDragging, offsetX, offsetY, layer`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Where every newly added image lands (top-left corner, scene units)
pub const DEFAULT_POSITION: Position = Position { x: 100.0, y: 100.0 };

/// Stable in-memory handle to one entry.
///
/// Ids are handed out by the [`Scene`](super::scene::Scene) and never
/// saved; a reloaded scene gets fresh ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

/// A point in scene units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Natural pixel dimensions of a decoded image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Content identity of a payload (blake3 digest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadKey(blake3::Hash);

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is plenty for log lines
        write!(f, "{}", &self.0.to_hex()[..12])
    }
}

/// Opaque encoded image, usually a `data:<mime>;base64,...` URI.
///
/// Cheap to clone; the content key is computed once on construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    data: Arc<str>,
    key: PayloadKey,
}

impl Payload {
    pub fn new(data: impl Into<Arc<str>>) -> Self {
        let data = data.into();
        let key = PayloadKey(blake3::hash(data.as_bytes()));
        Self { data, key }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn key(&self) -> PayloadKey {
        self.key
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads can be megabytes long, never dump them
        f.debug_struct("Payload")
            .field("key", &self.key.to_string())
            .field("len", &self.data.len())
            .finish()
    }
}

/// One placed image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub id: EntryId,
    /// Encoded image; resolved to pixels by the decode cache
    pub src: Payload,
    /// Top-left corner
    pub position: Position,
    /// Set once from the decoded image, never changed afterwards
    pub size: Size,
    /// Z-order key. Higher draws later (on top); gaps are allowed.
    pub layer: u64,
    /// True only while this entry is the active drag target
    pub is_dragging: bool,
    /// Pointer position relative to `position` at drag start
    pub drag_offset: Position,
    /// Grab offset written to storage. Taken from the saved scene on load
    /// and replaced by `drag_offset` whenever the entry is grabbed.
    pub rest_offset: Position,
}

impl ImageEntry {
    /// Closed axis-aligned box test: `[x, x+width] × [y, y+height]`
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.position.x
            && x <= self.position.x + f64::from(self.size.width)
            && y >= self.position.y
            && y <= self.position.y + f64::from(self.size.height)
    }
}

/// Wire form of an [`ImageEntry`].
///
/// Field order here is the key order in the saved JSON.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SavedImage<'a> {
    #[serde(borrow)]
    src: Cow<'a, str>,
    #[serde(serialize_with = "compact_number")]
    x: f64,
    #[serde(serialize_with = "compact_number")]
    y: f64,
    width: u32,
    height: u32,
    #[serde(default)]
    is_dragging: bool,
    #[serde(default, serialize_with = "compact_number")]
    offset_x: f64,
    #[serde(default, serialize_with = "compact_number")]
    offset_y: f64,
    #[serde(deserialize_with = "whole_number")]
    layer: u64,
}

impl<'a> SavedImage<'a> {
    /// Entries are always written at rest, with the offset of their last grab
    pub(crate) fn from_entry(entry: &'a ImageEntry) -> Self {
        Self {
            src: Cow::Borrowed(entry.src.as_str()),
            x: entry.position.x,
            y: entry.position.y,
            width: entry.size.width,
            height: entry.size.height,
            is_dragging: false,
            offset_x: entry.rest_offset.x,
            offset_y: entry.rest_offset.y,
            layer: entry.layer,
        }
    }

    /// Loaded entries are never mid-drag
    pub(crate) fn into_entry(self, id: EntryId) -> ImageEntry {
        ImageEntry {
            id,
            src: Payload::new(self.src.into_owned()),
            position: Position::new(self.x, self.y),
            size: Size {
                width: self.width,
                height: self.height,
            },
            layer: self.layer,
            is_dragging: false,
            drag_offset: Position::default(),
            rest_offset: Position::new(self.offset_x, self.offset_y),
        }
    }
}

/// Writes integral values as JSON integers (`100` rather than `100.0`),
/// matching what the web front end wrote for the same scene.
fn compact_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Accepts `3` as well as `3.0` for the layer key
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.fract() == 0.0 && value >= 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(serde::de::Error::custom(format!("invalid layer: {value}")))
    }
}
