//! Captures formatted `tracing` output for assertions on log lines.

use parking_lot::Mutex;
use regex::Regex;
use std::io;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// An in-memory log sink.
///
/// Install it for the current thread with [`LogCapture::set_default`]. Tests
/// that await must stay on the current-thread runtime for events to land here.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes all events on this thread at `TRACE` and above into the capture
    /// until the guard is dropped.
    #[must_use]
    pub fn set_default(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Returns the captured lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Returns true if any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    /// Returns true if any line matches the regular expression.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn matches(&self, pattern: &str) -> Result<bool, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(self.lines().iter().any(|line| re.is_match(line)))
    }
}

/// Writer handed out per event by [`LogCapture`].
#[derive(Debug)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info, warn};

    #[test]
    fn test_captures_every_level() {
        let logs = LogCapture::new();
        {
            let _guard = logs.set_default();
            debug!("Message 42 was validated successfully");
            info!(target = "x", "wrapped");
            warn!("dropped");
        }
        warn!("after the guard");

        assert_eq!(logs.lines().len(), 3);
        assert!(logs.contains("Message 42 was validated successfully"));
        assert!(logs.lines()[0].contains("DEBUG"));
        assert!(!logs.contains("after the guard"));
    }

    #[test]
    fn test_matches_regex() {
        let logs = LogCapture::new();
        let _guard = logs.set_default();
        info!("Message abc of type Foo is configured to be dropped");

        assert!(logs.matches(r"Message \w+ of type Foo").unwrap());
        assert!(!logs.matches(r"^nothing$").unwrap());
        assert!(logs.matches("(").is_err());
    }
}
