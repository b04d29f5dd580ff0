// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod highlight;
pub mod input;
pub mod markdown;
pub mod observability;
pub mod render;
pub mod session_id;
pub mod sse;
pub mod storage;
pub mod theme;

// Re-exports
pub use client::{ByteStream, ChatRequest, DEFAULT_API_URL, HttpTransport, Transport};
pub use error::{Error, Result};
pub use input::{InputBox, KeyAction, KeyPress};
pub use markdown::{MarkdownRenderer, RenderStyle};
pub use observability::register_biometrics;
pub use session_id::{SessionIdProvider, generate_session_id};
pub use sse::{EventDecoder, StreamEvent};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use theme::{Theme, ThemeSwitch};
