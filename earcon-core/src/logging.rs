//! Tracing setup with an in-memory log buffer.
//!
//! `init` installs a stderr fmt layer plus a `BufferLayer` that keeps the most
//! recent lines in memory, so a host UI can show playback logs without access
//! to stdout.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Lines kept by the buffer layer.
pub const LOG_BUFFER_LINES: usize = 500;

/// Shared ring buffer of formatted log lines, oldest first.
pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

/// A tracing layer that captures log events into a shared in-memory ring buffer.
pub struct BufferLayer {
    buffer: LogBuffer,
    max_lines: usize,
}

impl BufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self::with_max_lines(buffer, LOG_BUFFER_LINES)
    }

    pub fn with_max_lines(buffer: LogBuffer, max_lines: usize) -> Self {
        Self { buffer, max_lines }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        // Format: [HH:MM:SS] LEVEL [sound] message
        let line = format_line(&clock_now(), event.metadata().level(), &visitor);

        if let Ok(mut buf) = self.buffer.lock() {
            buf.push_back(line);
            while buf.len() > self.max_lines {
                buf.pop_front();
            }
        }
    }
}

/// Extracts the `message` and `sound` fields from a tracing event.
#[derive(Default)]
struct EventVisitor {
    message: String,
    sound: Option<String>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "sound" => self.sound = Some(format!("{:?}", value)),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "sound" => self.sound = Some(value.to_string()),
            _ => {}
        }
    }
}

fn format_line(time: &str, level: &Level, visitor: &EventVisitor) -> String {
    match &visitor.sound {
        Some(sound) => format!("[{}] {:>5} [{}] {}", time, level, sound, visitor.message),
        None => format!("[{}] {:>5} {}", time, level, visitor.message),
    }
}

/// Returns current UTC time as HH:MM:SS.
fn clock_now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let h = (secs % 86400) / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Installs the global subscriber and returns its log buffer.
///
/// `RUST_LOG` directives apply on top of `level`. If a global subscriber is
/// already set, the existing one is kept and the returned buffer stays empty.
pub fn init(level: Level) -> LogBuffer {
    let log_buffer: LogBuffer = Arc::new(Mutex::new(VecDeque::new()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env().add_directive(level.into()));

    let result = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(BufferLayer::new(Arc::clone(&log_buffer)))
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }
    log_buffer
}

/// Copies the buffered lines, oldest first.
pub fn snapshot(buffer: &LogBuffer) -> Vec<String> {
    buffer
        .lock()
        .map(|buf| buf.iter().cloned().collect())
        .unwrap_or_default()
}
