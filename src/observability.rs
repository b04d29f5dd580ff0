use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("streamchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("streamchat.client.request_errors");
pub(crate) static CLIENT_SENDS_REJECTED: Counter =
    Counter::new("streamchat.client.sends_rejected");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("streamchat.stream.events");
pub(crate) static STREAM_IGNORED_EVENTS: Counter =
    Counter::new("streamchat.stream.ignored_events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("streamchat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("streamchat.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("streamchat.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("streamchat.stream.duration_seconds");

pub(crate) static RENDER_PASSES: Counter = Counter::new("streamchat.render.passes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_SENDS_REJECTED);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_IGNORED_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&RENDER_PASSES);
}
