use std::path::PathBuf;
use std::sync::Arc;

use crate::client::HttpSettings;
use crate::progress::{ProgressChannel, DEFAULT_SUBSCRIBER_BUFFER};
use crate::resolve::{ReqwestResolver, Resolver};
use crate::transfer::{Downloader, ReqwestDownloader};
use crate::{ResolutionError, ResolvedTarget, TransferError, TransferId, TransferReport};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub http: HttpSettings,
    pub output_dir: PathBuf,
    pub subscriber_buffer: usize,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            http: HttpSettings::default(),
            output_dir,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

/// Resolver, transfer engine and progress channel bundled for the boundary layer.
///
/// Cheap to clone; all clones publish to the same progress channel.
#[derive(Clone)]
pub struct EngineHandle {
    resolver: Arc<dyn Resolver>,
    downloader: Arc<dyn Downloader>,
    progress: ProgressChannel,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let resolver = Arc::new(ReqwestResolver::new(config.http.clone()));
        let downloader = Arc::new(ReqwestDownloader::new(config.http, config.output_dir));
        Self::with_parts(
            resolver,
            downloader,
            ProgressChannel::with_buffer(config.subscriber_buffer),
        )
    }

    pub fn with_parts(
        resolver: Arc<dyn Resolver>,
        downloader: Arc<dyn Downloader>,
        progress: ProgressChannel,
    ) -> Self {
        Self {
            resolver,
            downloader,
            progress,
        }
    }

    pub fn progress(&self) -> &ProgressChannel {
        &self.progress
    }

    pub async fn resolve(&self, link: &str) -> Result<ResolvedTarget, ResolutionError> {
        self.resolver.resolve(link).await
    }

    /// Runs one transfer to completion. The return value, not the `Complete`
    /// event, is the authoritative outcome.
    pub async fn fetch(
        &self,
        transfer_id: &TransferId,
        url: &str,
        file_name: &str,
    ) -> Result<TransferReport, TransferError> {
        self.downloader
            .fetch(transfer_id, url, file_name, &self.progress)
            .await
    }
}
