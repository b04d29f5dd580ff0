//! The request lifecycle.
//!
//! [`StreamChat`] takes the prompt out of an [`InputBox`], posts it through a
//! [`Transport`], and drives a [`Renderer`] while the reply streams in. At most
//! one request is in flight at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::StreamExt;

use crate::client::{ChatRequest, Transport};
use crate::error::{Error, Result};
use crate::input::InputBox;
use crate::markdown::MarkdownRenderer;
use crate::observability::{
    CLIENT_SENDS_REJECTED, RENDER_PASSES, STREAM_DURATION, STREAM_ERRORS,
};
use crate::render::Renderer;
use crate::session_id::SessionIdProvider;
use crate::sse::{StreamEvent, process_sse, restore_newlines};
use crate::storage::Storage;
use crate::theme::Theme;

/// Where the client is in the request lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for a prompt.
    #[default]
    Idle,
    /// Request sent, no body yet.
    Sending,
    /// Reading the reply.
    Streaming,
    /// The request failed; housekeeping is running.
    Error,
}

/// Why a send did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The prompt was empty or whitespace.
    Empty,
    /// Another request is in flight.
    Busy,
}

/// Result of [`StreamChat::send`].
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The reply streamed to completion.
    Completed,
    /// The request or the read failed; the view shows the error.
    Failed(Error),
    /// Nothing was sent.
    Rejected(RejectReason),
}

impl SendOutcome {
    /// Returns true if a reply was received in full.
    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed)
    }

    /// Returns true if nothing was sent.
    pub fn is_rejected(&self) -> bool {
        matches!(self, SendOutcome::Rejected(_))
    }
}

/// At-most-one flag for in-flight requests.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag, or return `None` if it is already set.
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag: Arc::clone(&self.flag),
            })
    }

    /// Whether a request holds the flag.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Holds the [`InFlight`] flag; dropping it clears the flag.
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Counters for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatStats {
    /// Requests sent.
    pub requests: u64,
    /// Replies received in full.
    pub completed: u64,
    /// Requests that failed.
    pub failed: u64,
    /// Sends dropped because the prompt was empty or a request was in flight.
    pub rejected: u64,
    /// The session identifier, if one has been created.
    pub session_id: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// A streaming chat client.
pub struct StreamChat<T: Transport, S: Storage> {
    transport: T,
    session: SessionIdProvider<S>,
    markdown: MarkdownRenderer,
    in_flight: InFlight,
    state: Mutex<StreamState>,
    counters: Counters,
}

impl<T: Transport, S: Storage> StreamChat<T, S> {
    /// Creates a client posting through `transport`, keeping the session id
    /// in `session_storage`, and rendering replies with `markdown`.
    pub fn new(transport: T, session_storage: S, markdown: MarkdownRenderer) -> Self {
        Self {
            transport,
            session: SessionIdProvider::new(session_storage),
            markdown,
            in_flight: InFlight::new(),
            state: Mutex::new(StreamState::Idle),
            counters: Counters::default(),
        }
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: StreamState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Whether a request is in flight.
    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_set()
    }

    /// The session identifier, created on first use.
    pub fn session_id(&self) -> String {
        self.session.get_session_id()
    }

    /// Forget the session identifier.
    pub fn new_session(&self) {
        self.session.reset();
    }

    /// Restyle replies for `theme`.
    pub fn set_theme(&mut self, theme: Theme) {
        self.markdown.set_theme(theme);
    }

    /// The theme replies are rendered for.
    pub fn theme(&self) -> Theme {
        self.markdown.theme()
    }

    /// Request counters and the current session.
    pub fn stats(&self) -> ChatStats {
        ChatStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            session_id: self.session.current(),
        }
    }

    /// Send the prompt in `input` and stream the reply into `renderer`.
    ///
    /// An empty or whitespace-only prompt, or a send while another request is
    /// in flight, does nothing. Otherwise the prompt is moved out of the box,
    /// the box is disabled until the request ends, and the reply region is
    /// re-rendered from the whole reply so far after every payload. Failures
    /// replace the reply region with `error: <message>`.
    pub async fn send(&self, input: &mut InputBox, renderer: &mut dyn Renderer) -> SendOutcome {
        let prompt = input.prompt();
        if prompt.trim().is_empty() {
            return self.reject(RejectReason::Empty);
        }
        let Some(guard) = self.in_flight.try_acquire() else {
            return self.reject(RejectReason::Busy);
        };

        let session_id = self.session.get_session_id();
        self.set_state(StreamState::Sending);
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        renderer.print_user(&prompt);
        let prompt = input.take_prompt();
        input.disable();
        renderer.start_response();
        renderer.scroll_to_bottom();

        let start = Instant::now();
        let request = ChatRequest::new(prompt, session_id);
        let outcome = match self.stream_reply(&request, renderer).await {
            Ok(()) => {
                STREAM_DURATION.add(start.elapsed().as_secs_f64());
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                renderer.finish_response();
                SendOutcome::Completed
            }
            Err(err) => {
                self.set_state(StreamState::Error);
                if err.is_streaming() {
                    STREAM_ERRORS.click();
                }
                tracing::error!(error = %err, "request failed");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                renderer.fail_response(&format!("error: {err}"));
                SendOutcome::Failed(err)
            }
        };

        input.enable();
        input.focus();
        renderer.scroll_to_bottom();
        self.set_state(StreamState::Idle);
        drop(guard);
        outcome
    }

    async fn stream_reply(
        &self,
        request: &ChatRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let body = self.transport.post(request).await?;
        self.set_state(StreamState::Streaming);

        let mut events = std::pin::pin!(process_sse(body));
        let mut buffer = String::new();
        let mut payloads = 0usize;
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Data(payload) => {
                    tracing::debug!(payload = %payload, "payload");
                    buffer.push_str(&restore_newlines(&payload));
                    let rendered = self.markdown.render(&buffer);
                    RENDER_PASSES.click();
                    renderer.replace_response(&rendered);
                    renderer.scroll_to_bottom();
                    payloads += 1;
                }
                StreamEvent::Done => break,
            }
        }
        tracing::info!(payloads, bytes = buffer.len(), "reply finished");
        Ok(())
    }

    fn reject(&self, reason: RejectReason) -> SendOutcome {
        CLIENT_SENDS_REJECTED.click();
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(?reason, "send ignored");
        SendOutcome::Rejected(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_allows_one_holder() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_acquire();
        assert!(guard.is_some());
        assert!(in_flight.is_set());
        assert!(in_flight.try_acquire().is_none());

        drop(guard);
        assert!(!in_flight.is_set());
        assert!(in_flight.try_acquire().is_some());
    }

    #[test]
    fn cloned_flag_is_shared() {
        let in_flight = InFlight::new();
        let other = in_flight.clone();
        let _guard = in_flight.try_acquire();
        assert!(other.is_set());
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn outcome_predicates() {
        assert!(SendOutcome::Completed.is_completed());
        assert!(SendOutcome::Rejected(RejectReason::Busy).is_rejected());
        assert!(!SendOutcome::Failed(Error::api(500, None)).is_completed());
    }
}
