/// Rendering module
///
/// This module handles:
/// - Decoding payloads into pixels (decode.rs)
/// - Caching decoded pixels by payload content (cache.rs)
/// - Compositing the scene onto a drawing surface in layer order (compositor.rs)
///
/// Decodes run asynchronously; compositing is always synchronous and only
/// happens once every decode the scene needs has resolved.

pub mod cache;
pub mod compositor;
pub mod decode;

pub use cache::{decode_batch, DecodeCache, DecodeOutcome};
pub use compositor::{compose, FrameSurface, Surface};
pub use decode::{DecodeError, DecodedImage};
