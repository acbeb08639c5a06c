use tokio::sync::mpsc::UnboundedSender;
use vidbatch_core::{JobId, JobRequest};

use crate::{EngineEvent, Extraction, ExtractionError};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Forwards progress into the orchestrator's completion channel.
pub struct ChannelProgressSink {
    tx: UnboundedSender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        // The run may already have been aborted; progress is then irrelevant.
        let _ = self.tx.send(event);
    }
}

/// Retrieves one video and reports where its bytes ended up.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        job_id: JobId,
        request: &JobRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Extraction, ExtractionError>;
}
