//! Grabber engine: link resolution, streamed transfers and progress fan-out.
mod client;
mod decode;
mod engine;
mod filename;
mod persist;
mod progress;
mod resolve;
mod state;
mod transfer;
mod types;

pub use client::{browser_headers, HttpSettings, DEFAULT_REFERER};
pub use decode::{decode_page, decode_page_lossy, DecodeError, DecodedPage};
pub use engine::{EngineConfig, EngineHandle};
pub use filename::{sanitize_file_name, DEFAULT_FILE_NAME};
pub use persist::{ensure_output_dir, PersistError};
pub use progress::{
    ProgressChannel, ProgressEvent, ProgressSink, SubscriberId, Subscription,
    DEFAULT_SUBSCRIBER_BUFFER,
};
pub use resolve::{parse_page, ParsedPage, ReqwestResolver, Resolver};
pub use state::{Phase, TransferState};
pub use transfer::{Downloader, ReqwestDownloader};
pub use types::{
    ResolutionError, ResolvedTarget, TransferError, TransferId, TransferReport, ValidationError,
};
