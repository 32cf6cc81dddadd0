//! Logging initialization.
//!
//! Engine functions only emit `tracing` events; nothing is printed until a
//! host calls [`init`]. In the browser, formatted lines go to `console.log`;
//! natively they go to stderr.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

static INIT_ONCE: Once = Once::new();

/// Installs the global subscriber. Only the first call has any effect.
///
/// `filter` uses `EnvFilter` directive syntax (`"debug"`,
/// `"devkit_core=trace"`). When it is `None`, `RUST_LOG` is consulted on
/// native targets before falling back to [`DEFAULT_FILTER`]. An unparsable
/// directive also falls back to the default.
pub fn init(filter: Option<&str>) {
    INIT_ONCE.call_once(|| {
        let filter = build_filter(filter);
        install(filter);
    });
}

fn build_filter(filter: Option<&str>) -> EnvFilter {
    match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        #[cfg(not(target_arch = "wasm32"))]
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        #[cfg(target_arch = "wasm32")]
        None => EnvFilter::new(DEFAULT_FILTER),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn install(filter: EnvFilter) {
    // Another subscriber may already be installed by the host; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
fn install(filter: EnvFilter) {
    // The wasm32 target has no clock, and the console does not render ANSI.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time()
        .with_writer(console::ConsoleWriter::default)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io::{self, Write};

    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = console, js_name = log)]
        fn console_log(line: &str);
    }

    /// Buffers one formatted event and hands it to `console.log` on drop.
    #[derive(Default)]
    pub(super) struct ConsoleWriter {
        buf: Vec<u8>,
    }

    impl Write for ConsoleWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if !self.buf.is_empty() {
                let line = String::from_utf8_lossy(&self.buf);
                console_log(line.trim_end());
                self.buf.clear();
            }
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let _ = self.flush();
        }
    }
}
