//! Heuristic end-of-reply detection for query commands.
//!
//! The device protocol has no framing: a reply is considered finished as
//! soon as no bytes are waiting right after a line has been read. A device
//! that pauses mid-reply will have its answer split across two queries.

use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;

use crate::domain::ResponseBatch;
use crate::usecases::link::OpenLink;
use crate::usecases::ports::LinkError;

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
pub struct ResponseCollector {
    deadline: Duration,
    idle_interval: Duration,
}

impl Default for ResponseCollector {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_TIMEOUT)
    }
}

impl ResponseCollector {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }

    /// Reads reply lines until a quiet period follows a line or the deadline
    /// passes.
    pub fn collect(&self, link: &mut OpenLink) -> Result<ResponseBatch, LinkError> {
        let started = Instant::now();
        let mut lines = Vec::new();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.deadline {
                break;
            }
            let remaining = self.deadline - elapsed;

            if link.bytes_pending()? == 0 {
                thread::sleep(self.idle_interval.min(remaining));
                continue;
            }

            if let Some(line) = link.read_line(remaining)? {
                lines.push(line);
                if link.bytes_pending()? == 0 {
                    debug!(lines = lines.len(), "Reply finished on quiet line");
                    return Ok(ResponseBatch::complete(lines));
                }
            }
        }

        if lines.is_empty() {
            debug!(
                deadline_ms = self.deadline.as_millis() as u64,
                "No reply before deadline"
            );
            Ok(ResponseBatch::timed_out())
        } else {
            Ok(ResponseBatch::complete(lines))
        }
    }
}
