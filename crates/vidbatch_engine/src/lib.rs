//! vidbatch engine: collaborator seams, adapters, download jobs and the run orchestrator.
mod content_type;
mod extract;
mod filename;
mod http;
mod job;
mod orchestrator;
mod persist;
mod proxy;
mod sink;
mod status;
mod types;
mod ytdlp;

pub use content_type::{guess_content_type, FALLBACK_CONTENT_TYPE};
pub use extract::{ChannelProgressSink, Extractor, ProgressSink};
pub use filename::{local_file_name, storage_key, MAX_KEY_STEM};
pub use http::{HttpExtractor, HttpSettings};
pub use job::{DownloadJob, JobError, PersistMode};
pub use orchestrator::Orchestrator;
pub use persist::{ensure_storage_dir, move_into, reserve_unique, AtomicFileWriter, PersistError};
pub use proxy::{
    PlatformProxyPool, PlatformProxySettings, ProxyPool, ProxyProvider, StaticProxyPool,
};
pub use sink::{FsResultSink, FsSinkSettings, ResultSink};
pub use status::{LogStatus, StatusChannel, TerminalStatus};
pub use types::{
    EngineEvent, Extraction, ExtractionError, ExtractionKind, JobProgress, ProviderError,
    RunError, SinkError, Stage,
};
pub use ytdlp::{YtDlpExtractor, YtDlpSettings};
