//! Line-oriented output forwarding.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Destination for forwarded child output and run summaries.
pub trait LineSink: Send + Sync {
    fn line(&self, stream: Stream, line: &str);
}

/// Writes each line to the matching stream of this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn line(&self, stream: Stream, line: &str) {
        // A closed pipe must not take the supervisor down with it.
        match stream {
            Stream::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{line}");
                let _ = out.flush();
            }
            Stream::Stderr => {
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
        }
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(Stream, String)>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All captured lines in arrival order, regardless of stream.
    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, l)| l).collect()
    }

    pub fn entries(&self) -> Vec<(Stream, String)> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LineSink for CaptureSink {
    fn line(&self, stream: Stream, line: &str) {
        self.lines.lock().push((stream, line.to_string()));
    }
}

/// Line reader over child output that never rejects bytes.
///
/// Invalid UTF-8 is replaced with U+FFFD; `\n` and `\r\n` terminators are
/// stripped.
pub(crate) struct LossyLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LossyLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Spawns a task that copies `reader` into `sink` line by line until EOF.
pub(crate) fn forward<R>(reader: R, stream: Stream, sink: Arc<dyn LineSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = LossyLines::new(reader);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => sink.line(stream, &line),
                Ok(None) => break,
                Err(e) => {
                    warn!(target: "pace.exec.output", ?stream, error = %e, "output stream closed with error");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forward_copies_every_line() {
        let sink = CaptureSink::new();
        let input: &[u8] = b"first\nsecond\n\nlast-without-newline";
        forward(input, Stream::Stderr, sink.clone()).await.unwrap();

        assert_eq!(sink.lines(), vec!["first", "second", "", "last-without-newline"]);
        assert!(sink.entries().iter().all(|(s, _)| *s == Stream::Stderr));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_and_reading_continues() {
        let sink = CaptureSink::new();
        let input: &[u8] = b"title \xff\r\nafter-bad-byte\nCrawl and upload summary:\n";
        forward(input, Stream::Stdout, sink.clone()).await.unwrap();

        assert_eq!(
            sink.lines(),
            vec!["title \u{fffd}", "after-bad-byte", "Crawl and upload summary:"]
        );
    }
}
