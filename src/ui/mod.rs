//! Client view model and its terminal drawing
//!
//! - `ClientView`: login/chat panel visibility and the record control label
//! - `MessageList`: rendered chat lines with per-user partial replacement
//! - `TerminalRenderer`: draws view changes to a terminal

mod renderer;
mod terminal;
mod view;

pub use renderer::{MessageList, RenderUpdate, RenderedLine};
pub use terminal::TerminalRenderer;
pub use view::{ClientView, Panel, START_LABEL, STOP_LABEL};
