//! streamchat TUI - Terminal surface for streamchat
//!
//! A full-screen chat client: a header with the connection indicator, the
//! conversation, a composer that can carry an image, and a status line.
//!
//! # Architecture
//!
//! - **App**: Event loop and the single owner of the chat session
//! - **Display**: Pure message-to-lines rendering helpers
//! - **Composer**: Input buffer, slash commands, pending image
//! - **Theme**: Colour palette

pub mod app;
pub mod composer;
pub mod display;
pub mod theme;

pub use app::App;
