use crate::JobResult;

/// Running counters for one orchestrated run.
///
/// Owned by the single consumer loop; `succeeded <= processed <= total`
/// holds after every [`RunSummary::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            succeeded: 0,
        }
    }

    /// Accounts for one completed job.
    ///
    /// Results arriving after every job has been counted are ignored.
    pub fn record(&mut self, result: &JobResult) {
        if self.processed >= self.total {
            return;
        }
        self.processed += 1;
        if result.is_success() {
            self.succeeded += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }

    pub fn failed(&self) -> usize {
        self.processed - self.succeeded
    }
}

/// Status line for one completed job, e.g. `2/5 → https://x/a ✔`.
pub fn progress_line(summary: &RunSummary, result: &JobResult) -> String {
    let head = format!(
        "{}/{} → {}",
        summary.processed,
        summary.total,
        result.source_url()
    );
    match result {
        JobResult::Success { .. } => format!("{head} ✔"),
        JobResult::Failure { error_message, .. } => format!("{head} ✗ ({error_message})"),
    }
}

pub fn final_status(summary: &RunSummary) -> String {
    format!(
        "Processing finished. Successfully downloaded {}/{} videos.",
        summary.succeeded, summary.total
    )
}
