use std::io;

use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

/// Collects one formatted event and writes it to the browser console.
pub struct ConsoleWriter {
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        web_sys::console::log_1(&JsValue::from_str(line.trim_end()));
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct Console;

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter { buffer: Vec::new() }
    }
}

/// Routes `tracing` output to the console. Calls after the first are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_writer(Console)
        .without_time()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
