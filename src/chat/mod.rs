//! Chat application module for streaming conversations.
//!
//! This module provides the request lifecycle and the pieces the REPL binary
//! is assembled from:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the send / stream / render lifecycle
//! - [`commands`]: Slash command parsing
//! - [`keys`]: Enter-key handling for the line editor

mod commands;
mod config;
mod keys;
mod session;

pub use crate::render::{BufferRenderer, PlainTextRenderer, Renderer, TerminalRenderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{API_URL_ENV, ChatArgs, ChatConfig, default_state_path};
pub use keys::{EnterKeyHandler, bind_enter_keys, key_press};
pub use session::{
    ChatStats, InFlight, InFlightGuard, RejectReason, SendOutcome, StreamChat, StreamState,
};
