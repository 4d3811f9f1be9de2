//! `pinboard` is a layered image board built with the Iced GUI framework.
//!
//! Images are dropped onto a canvas, dragged around and stacked. The board
//! is saved after every committed change and restored on the next start.
//!
//! - [`state`]: the scene model, the pointer gesture state machine and persistence
//! - [`render`]: payload decoding, the decode cache and layer-ordered compositing
//! - [`acquire`]: turning a chosen file into an encoded payload
//! - [`ui`]: the board canvas widget
//! - [`app`]: the application shell wiring it all together

pub mod acquire;
pub mod app;
pub mod config;
pub mod render;
pub mod state;
pub mod ui;

pub use app::Message;
