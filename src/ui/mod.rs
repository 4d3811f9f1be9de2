/// User interface module
///
/// - `canvas.rs` - the board canvas: draws the scene, reports pointer events

pub mod canvas;

pub use canvas::SceneCanvas;
