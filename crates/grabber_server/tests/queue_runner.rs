use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grabber_core::SessionState;
use grabber_engine::{
    Downloader, EngineHandle, ProgressChannel, ProgressSink, ResolutionError, ResolvedTarget,
    Resolver, TransferError, TransferId, TransferReport,
};
use grabber_server::QueueRunner;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct CountingResolver {
    calls: AtomicUsize,
}

#[async_trait]
impl Resolver for CountingResolver {
    async fn resolve(&self, link: &str) -> Result<ResolvedTarget, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if link.contains("broken") {
            return Err(ResolutionError::PatternNotFound);
        }
        Ok(ResolvedTarget {
            display_name: link.to_string(),
            direct_url: format!("{link}/file"),
            transfer_id: TransferId::generate(),
        })
    }
}

#[derive(Default)]
struct CountingDownloader {
    calls: AtomicUsize,
}

#[async_trait]
impl Downloader for CountingDownloader {
    async fn fetch(
        &self,
        transfer_id: &TransferId,
        _url: &str,
        destination_name: &str,
        _sink: &dyn ProgressSink,
    ) -> Result<TransferReport, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransferReport {
            transfer_id: transfer_id.clone(),
            file_name: destination_name.to_string(),
            path: destination_name.into(),
            bytes_written: 0,
            bytes_expected: None,
        })
    }
}

fn engine(resolver: Arc<CountingResolver>, downloader: Arc<CountingDownloader>) -> EngineHandle {
    EngineHandle::with_parts(resolver, downloader, ProgressChannel::new())
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn run_visits_every_link_and_skips_failures() {
    let resolver = Arc::new(CountingResolver::default());
    let downloader = Arc::new(CountingDownloader::default());
    let shutdown = CancellationToken::new();
    let (queue, runner) = QueueRunner::spawn(
        engine(resolver.clone(), downloader.clone()),
        Duration::ZERO,
        shutdown.clone(),
    );

    let outcome = queue
        .submit("https://a.test/1\nhttps://a.test/broken\nhttps://a.test/3".to_string())
        .await
        .unwrap();
    assert!(outcome.run_started);
    assert_eq!(outcome.view.total, 3);

    eventually(|| queue.view().session == SessionState::Idle).await;
    let view = queue.view();
    assert_eq!(view.completed, 2);
    assert_eq!(view.skipped, 1);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 2);

    shutdown.cancel();
    runner.await.unwrap();
}

#[tokio::test]
async fn second_submission_during_run_is_ignored() {
    let shutdown = CancellationToken::new();
    let (queue, _runner) = QueueRunner::spawn(
        engine(Arc::default(), Arc::default()),
        Duration::from_secs(3600),
        shutdown.clone(),
    );

    assert!(queue.submit("https://a.test/1".to_string()).await.unwrap().run_started);
    let again = queue.submit("https://a.test/2".to_string()).await.unwrap();
    assert!(!again.run_started);
    assert_eq!(again.view.remaining, vec!["https://a.test/1".to_string()]);
    shutdown.cancel();
}

#[tokio::test]
async fn confirmed_clear_cancels_pending_advance() {
    let resolver = Arc::new(CountingResolver::default());
    let downloader = Arc::new(CountingDownloader::default());
    let shutdown = CancellationToken::new();
    let (queue, _runner) = QueueRunner::spawn(
        engine(resolver.clone(), downloader.clone()),
        Duration::from_millis(300),
        shutdown.clone(),
    );

    queue
        .submit("https://a.test/1\nhttps://a.test/2".to_string())
        .await
        .unwrap();
    eventually(|| downloader.calls.load(Ordering::SeqCst) == 1).await;

    let pending = queue.clear(false).await.unwrap();
    assert!(pending.confirmation_required);
    assert!(pending.view.awaiting_confirmation);

    let cancelled = queue.cancel_clear().await.unwrap();
    assert!(!cancelled.view.awaiting_confirmation);

    let cleared = queue.clear(true).await.unwrap();
    assert!(cleared.run_aborted);
    assert_eq!(cleared.view.session, SessionState::Idle);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    shutdown.cancel();
}

#[tokio::test]
async fn requests_fail_once_runner_stops() {
    let shutdown = CancellationToken::new();
    let (queue, runner) = QueueRunner::spawn(
        engine(Arc::default(), Arc::default()),
        Duration::ZERO,
        shutdown.clone(),
    );

    shutdown.cancel();
    runner.await.unwrap();

    assert!(queue.submit("https://a.test/1".to_string()).await.is_err());
}
