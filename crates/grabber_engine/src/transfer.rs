use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use grabber_logging::{grabber_error, grabber_info, grabber_warn};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::client::{build_client, describe_reqwest_error, HttpSettings};
use crate::filename::sanitize_file_name;
use crate::persist::ensure_output_dir;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::state::TransferState;
use crate::{TransferError, TransferId, TransferReport};

/// With no declared size, an indeterminate progress event goes out per this many bytes.
const INDETERMINATE_STEP: u64 = 1024 * 1024;

#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Streams `url` into `destination_name` (sanitized) and reports progress to `sink`.
    ///
    /// Exactly one terminal event (`Complete` or `Failed`) is emitted per call,
    /// after the file handle has been closed.
    async fn fetch(
        &self,
        transfer_id: &TransferId,
        url: &str,
        destination_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<TransferReport, TransferError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDownloader {
    settings: HttpSettings,
    output_dir: PathBuf,
}

impl ReqwestDownloader {
    pub fn new(settings: HttpSettings, output_dir: PathBuf) -> Self {
        Self {
            settings,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn stream_to_file(
        &self,
        state: &mut TransferState,
        url: &str,
        file_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<(), TransferError> {
        let client = build_client(&self.settings).map_err(|err| remote_error(&err))?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| remote_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::RemoteFetchFailed {
                status: Some(status.as_u16()),
                message: format!("remote responded with {status}"),
            });
        }

        ensure_output_dir(&self.output_dir).map_err(|err| sink_error(file_name, err))?;
        let file = File::create(state.destination())
            .await
            .map_err(|err| sink_error(file_name, err))?;
        let mut writer = BufWriter::new(file);

        state.begin(response.content_length());
        let pumped = pump_body(state, response, &mut writer, file_name, sink).await;
        // Close the sink before reporting anything, success or not.
        let closed = close_sink(writer, file_name).await;
        pumped?;
        closed?;

        if let Some(expected) = state.bytes_expected() {
            if state.bytes_transferred() < expected {
                return Err(TransferError::StreamInterrupted {
                    message: format!(
                        "connection closed after {} of {} bytes",
                        state.bytes_transferred(),
                        expected
                    ),
                });
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Downloader for ReqwestDownloader {
    async fn fetch(
        &self,
        transfer_id: &TransferId,
        url: &str,
        destination_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<TransferReport, TransferError> {
        let file_name = sanitize_file_name(destination_name);
        let path = self.output_dir.join(&file_name);
        let mut state = TransferState::new(transfer_id.clone(), path.clone());
        grabber_info!("Starting download: {file_name}");

        match self.stream_to_file(&mut state, url, &file_name, sink).await {
            Ok(()) => {
                state.complete();
                grabber_info!(
                    "Download completed: {file_name} ({} bytes)",
                    state.bytes_transferred()
                );
                sink.emit(ProgressEvent::Complete {
                    transfer_id: transfer_id.clone(),
                    name: file_name.clone(),
                    path: file_name.clone(),
                });
                Ok(TransferReport {
                    transfer_id: transfer_id.clone(),
                    file_name,
                    path,
                    bytes_written: state.bytes_transferred(),
                    bytes_expected: state.bytes_expected(),
                })
            }
            Err(err) => {
                state.fail();
                grabber_error!("Error downloading {file_name}: {err}");
                if state.bytes_transferred() > 0 {
                    grabber_warn!(
                        "partial file left at {} ({} bytes)",
                        path.display(),
                        state.bytes_transferred()
                    );
                }
                sink.emit(ProgressEvent::Failed {
                    transfer_id: transfer_id.clone(),
                    name: file_name,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

async fn pump_body(
    state: &mut TransferState,
    response: reqwest::Response,
    writer: &mut BufWriter<File>,
    file_name: &str,
    sink: &dyn ProgressSink,
) -> Result<(), TransferError> {
    let mut last_percent = None;
    let mut next_indeterminate_mark = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| TransferError::StreamInterrupted {
            message: describe_reqwest_error(&err),
        })?;
        write_chunk(writer, &chunk, file_name).await?;
        state.record_chunk(chunk.len() as u64);

        let percent = state.percent();
        let publish = match percent {
            Some(_) => percent != last_percent,
            None => {
                let due = state.bytes_transferred() >= next_indeterminate_mark;
                if due {
                    next_indeterminate_mark = state.bytes_transferred() + INDETERMINATE_STEP;
                }
                due
            }
        };
        if publish {
            last_percent = percent;
            sink.emit(ProgressEvent::Progress {
                transfer_id: state.transfer_id().clone(),
                percent,
                name: file_name.to_string(),
            });
        }
    }
    Ok(())
}

async fn close_sink(mut writer: BufWriter<File>, file_name: &str) -> Result<(), TransferError> {
    writer
        .flush()
        .await
        .map_err(|err| sink_error(file_name, err))?;
    let file = writer.into_inner();
    file.sync_all()
        .await
        .map_err(|err| sink_error(file_name, err))
}

async fn write_chunk(
    writer: &mut BufWriter<File>,
    chunk: &Bytes,
    file_name: &str,
) -> Result<(), TransferError> {
    writer
        .write_all(chunk)
        .await
        .map_err(|err| sink_error(file_name, err))
}

fn remote_error(err: &reqwest::Error) -> TransferError {
    TransferError::RemoteFetchFailed {
        status: err.status().map(|s| s.as_u16()),
        message: describe_reqwest_error(err),
    }
}

fn sink_error(file_name: &str, err: impl std::fmt::Display) -> TransferError {
    TransferError::SinkWriteFailed {
        file_name: file_name.to_string(),
        message: err.to_string(),
    }
}
