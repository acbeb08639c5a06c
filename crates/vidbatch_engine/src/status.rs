use std::io::Write;
use std::sync::Mutex;

use vidbatch_logging::{batch_debug, batch_info};

/// A single overwritable "current status" line.
pub trait StatusChannel: Send + Sync {
    fn set_status(&self, message: &str);

    /// Called once with the run's closing status.
    fn finish(&self, message: &str) {
        self.set_status(message);
    }
}

/// Logs each status and keeps the latest one.
#[derive(Debug, Default)]
pub struct LogStatus {
    current: Mutex<Option<String>>,
}

impl LogStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.current).clone()
    }
}

impl StatusChannel for LogStatus {
    fn set_status(&self, message: &str) {
        batch_info!("{}", message);
        *lock(&self.current) = Some(message.to_string());
    }
}

/// Redraws one terminal line for every update, on stderr unless another
/// writer is given. Updates are logged at debug level only.
pub struct TerminalStatus {
    out: Mutex<Box<dyn Write + Send>>,
    current: Mutex<Option<String>>,
}

impl TerminalStatus {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            current: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.current).clone()
    }

    fn draw(&self, message: &str, newline: bool) {
        batch_debug!("status: {}", message);
        *lock(&self.current) = Some(message.to_string());

        let mut out = lock(&self.out);
        // \r + "erase line" keeps the previous, possibly longer, status from showing through.
        let _ = write!(out, "\r\x1b[2K{message}");
        if newline {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}

impl Default for TerminalStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel for TerminalStatus {
    fn set_status(&self, message: &str) {
        self.draw(message, false);
    }

    fn finish(&self, message: &str) {
        self.draw(message, true);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn log_status_keeps_the_latest_line() {
        let status = LogStatus::new();
        assert_eq!(status.current(), None);
        status.set_status("1/2 → https://x/a ✔");
        status.finish("Processing finished. Successfully downloaded 1/2 videos.");
        assert_eq!(
            status.current().as_deref(),
            Some("Processing finished. Successfully downloaded 1/2 videos.")
        );
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn terminal_status_draws_each_update_once() {
        let buffer = SharedBuffer::default();
        let status = TerminalStatus::with_writer(Box::new(buffer.clone()));

        status.set_status("1/2 → https://x/a ✔");
        status.set_status("2/2 → https://x/b ✗ (gone)");
        status.finish("Processing finished. Successfully downloaded 1/2 videos.");

        let drawn = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            drawn,
            "\r\x1b[2K1/2 → https://x/a ✔\
             \r\x1b[2K2/2 → https://x/b ✗ (gone)\
             \r\x1b[2KProcessing finished. Successfully downloaded 1/2 videos.\n"
        );
        assert_eq!(
            status.current().as_deref(),
            Some("Processing finished. Successfully downloaded 1/2 videos.")
        );
    }
}
