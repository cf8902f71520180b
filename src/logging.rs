//! Console logging for `tracing` events
//!
//! `ConsoleWriter` is a `MakeWriter` that buffers one formatted event and
//! hands the finished line, with its level, to a sink when the writer is
//! dropped. In the browser the sink is `console.{error,warn,info,debug}`.

use std::io::{self, Write};
#[cfg(target_arch = "wasm32")]
use std::sync::Once;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Builds one `LineWriter` per event
#[derive(Clone)]
pub struct ConsoleWriter<S> {
    sink: S,
}

impl<S> ConsoleWriter<S>
where
    S: Fn(Level, &str) + Clone,
{
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

pub struct LineWriter<S: Fn(Level, &str)> {
    sink: S,
    level: Level,
    buf: Vec<u8>,
}

impl<S: Fn(Level, &str)> Write for LineWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Fn(Level, &str)> Drop for LineWriter<S> {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if !line.is_empty() {
            (self.sink)(self.level, line);
        }
    }
}

impl<'a, S> MakeWriter<'a> for ConsoleWriter<S>
where
    S: Fn(Level, &str) + Clone + 'a,
{
    type Writer = LineWriter<S>;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            sink: self.sink.clone(),
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        LineWriter {
            sink: self.sink.clone(),
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

/// Level filter from a config string; unknown values fall back to `info`.
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

#[cfg(target_arch = "wasm32")]
static INSTALL: Once = Once::new();

/// Install the console subscriber as the global default. Only the first
/// call has any effect.
#[cfg(target_arch = "wasm32")]
pub fn init_console(level: Level) {
    INSTALL.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(ConsoleWriter::new(console_line))
            .with_max_level(level)
            .with_target(true)
            .without_time()
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            web_sys::console::warn_1(&"[logging] a tracing subscriber is already installed".into());
        }
    });
}

#[cfg(target_arch = "wasm32")]
fn console_line(level: Level, line: &str) {
    let line = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::ERROR => web_sys::console::error_1(&line),
        Level::WARN => web_sys::console::warn_1(&line),
        Level::INFO => web_sys::console::info_1(&line),
        _ => web_sys::console::debug_1(&line),
    }
}
