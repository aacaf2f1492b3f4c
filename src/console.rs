// src/console.rs

//! Serialised console output.
//!
//! Child output lines and `tracing` log events both go through one
//! [`ConsoleSink`]; each line is written while holding a single mutex, so
//! concurrent writers never interleave inside a line. No reordering is done:
//! lines appear in lock-acquisition order.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

type Output = Box<dyn Write + Send>;

/// Cloneable handle to the shared output stream.
#[derive(Clone)]
pub struct ConsoleSink {
    out: Arc<Mutex<Output>>,
}

impl ConsoleSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    /// Sink writing to the process's stdout (picked up by the journal).
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write one complete line.
    ///
    /// Write errors (e.g. a closed stdout) are dropped: there is nowhere
    /// left to report them.
    pub fn write_line(&self, line: &str) {
        let mut out = self.lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }

    fn lock(&self) -> MutexGuard<'_, Output> {
        // A writer that panicked mid-line leaves nothing we need to repair.
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

/// Writer handed to `tracing-subscriber`; holds the console lock for the
/// whole formatted event.
pub struct ConsoleWriter<'a> {
    guard: MutexGuard<'a, Output>,
}

impl Write for ConsoleWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

impl Drop for ConsoleWriter<'_> {
    fn drop(&mut self) {
        let _ = self.guard.flush();
    }
}

impl<'a> MakeWriter<'a> for ConsoleSink {
    type Writer = ConsoleWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter { guard: self.lock() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            // Byte-at-a-time to give other threads every chance to interleave.
            let Some(&byte) = buf.first() else {
                return Ok(0);
            };
            self.0.lock().unwrap().push(byte);
            Ok(1)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn concurrent_lines_stay_whole() {
        let buffer = Buffer::default();
        let sink = ConsoleSink::new(buffer.clone());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        sink.write_line(&format!("worker-{t} line {i:03} payload"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.starts_with("worker-") && line.ends_with(" payload"), "{line}");
        }
    }

    #[test]
    fn per_writer_order_is_preserved() {
        let buffer = Buffer::default();
        let sink = ConsoleSink::new(buffer.clone());
        for i in 0..10 {
            sink.write_line(&i.to_string());
        }
        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let got: Vec<&str> = text.lines().collect();
        assert_eq!(got, (0..10).map(|i| i.to_string()).collect::<Vec<_>>());
    }
}
