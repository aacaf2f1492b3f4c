// src/exec/stream.rs

//! Line readers for a child's stdout/stderr.
//!
//! Each pipe gets a dedicated blocking reader thread which forwards complete
//! lines to the owning worker over an mpsc channel. The channel is the
//! worker's only input, so the supervisor can also push a
//! [`WorkerEvent::Wake`] into it to interrupt a worker waiting on a quiet
//! child.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        })
    }
}

/// Input to a worker's run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// One line of child output, without its line terminator.
    Line { stream: StreamKind, text: String },
    /// The stream reached EOF (or failed, which is treated the same).
    Closed(StreamKind),
    /// Re-check the shutdown flag.
    Wake,
}

/// Spawn a thread that forwards `reader` line by line, then sends `Closed`.
pub fn spawn_line_reader<R>(
    worker: &str,
    stream: StreamKind,
    reader: R,
    tx: Sender<WorkerEvent>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let thread_name = format!("{worker}-{stream}");
    thread::Builder::new().name(thread_name).spawn(move || {
        forward_lines(reader, stream, &tx);
        let _ = tx.send(WorkerEvent::Closed(stream));
    })
}

/// Read until EOF, sending each line. A trailing partial line (no final
/// newline) is sent once as a line of its own.
pub fn forward_lines<R: Read>(reader: R, stream: StreamKind, tx: &Sender<WorkerEvent>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = decode_line(&buf);
                if tx.send(WorkerEvent::Line { stream, text }).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(%stream, error = %e, "read error on child output; treating as EOF");
                break;
            }
        }
    }
}

fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
