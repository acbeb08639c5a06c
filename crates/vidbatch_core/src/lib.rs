//! vidbatch core: pure job data, run accounting and input configuration.
mod input;
mod job;
mod record;
mod summary;

pub use input::{
    ConfigurationError, RunInput, DEFAULT_PROXY_GROUP, DEFAULT_QUALITY, PROXY_DISABLED,
};
pub use job::{JobId, JobRequest, JobResult};
pub use record::DatasetRecord;
pub use summary::{final_status, progress_line, RunSummary};
