//! Run orchestration: classify, resolve, prepare output, download, report

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::credentials::{Credential, CredentialManager};
use super::downloader::{RetryPolicy, TrackDownloader};
use super::events::EventSink;
use super::report::ReconciliationReport;
use super::resolver::CollectionResolver;
use crate::error::PipelineError;
use crate::remote::{CatalogApi, TokenSource};
use crate::track::{
    CollectionReference, ReferenceKind, RunLedger, Settlement, TrackCounts, TrackDescriptor,
};
use crate::utils::TagWriter;

/// Stages a run passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStage {
    Classifying,
    Resolving,
    PreparingOutput,
    Downloading,
    Reporting,
}

/// Everything a run needs from its caller
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Track, album or playlist link
    pub reference: String,
    /// Base output directory
    pub output_dir: PathBuf,
    /// Last known access token, possibly empty or stale
    pub token: String,
}

/// Result of a run that got past resolution
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reference: CollectionReference,
    /// Album or playlist name; `None` for a single track
    pub name: Option<String>,
    /// Directory the tracks were written to
    pub output_dir: PathBuf,
    pub counts: TrackCounts,
    pub report: ReconciliationReport,
    /// Token held at the end of the run
    pub token: String,
}

/// The download pipeline for one reference at a time
pub struct Pipeline {
    resolver: CollectionResolver,
    downloader: TrackDownloader,
}

impl Pipeline {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        tags: Arc<dyn TagWriter>,
        tokens: Arc<dyn TokenSource>,
        retry: RetryPolicy,
    ) -> Self {
        let credentials = CredentialManager::new(api.clone(), tokens);
        Self::from_parts(
            CollectionResolver::new(api.clone()),
            TrackDownloader::new(api, tags, credentials, retry),
        )
    }

    pub fn from_parts(resolver: CollectionResolver, downloader: TrackDownloader) -> Self {
        Self {
            resolver,
            downloader,
        }
    }

    /// Run the whole pipeline for one reference
    ///
    /// Fatal errors are reported on `events` before being returned. Per-track
    /// failures never end the run; they show up in the summary's report.
    pub async fn run(
        &self,
        request: RunRequest,
        events: &EventSink,
    ) -> Result<RunSummary, PipelineError> {
        match self.execute(request, events).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                events.diagnostic(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: RunRequest,
        events: &EventSink,
    ) -> Result<RunSummary, PipelineError> {
        enter(RunStage::Classifying);
        let reference = CollectionReference::parse(&request.reference)
            .ok_or_else(|| PipelineError::InvalidReference(request.reference.clone()))?;

        enter(RunStage::Resolving);
        let resolved = self.resolver.resolve(&reference, events).await?;

        enter(RunStage::PreparingOutput);
        let output_dir = match &resolved.subdirectory {
            Some(sub) => request.output_dir.join(sub),
            None => request.output_dir.clone(),
        };
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| PipelineError::OutputDirectory {
                path: output_dir.clone(),
                source,
            })?;

        enter(RunStage::Downloading);
        let tracks = resolved.tracks;
        let mut ledger = RunLedger::new(tracks.len());
        let mut credential = Credential::new(request.token);
        events.counts(TrackCounts::reset(tracks.len())).await;

        for index in 0..tracks.len() {
            let outcome = self
                .downloader
                .process(index, &tracks, &mut ledger, &mut credential, &output_dir, events)
                .await;

            if let Err(e) = outcome {
                if let Some(state) = ledger.get_mut(index) {
                    state.settlement = Settlement::Failed;
                    state.error = Some(format!("{:#}", e));
                }
                events
                    .diagnostic(format!("unexpected error while processing track: {:#}", e))
                    .await;
                events.counts(ledger.counts()).await;
            }
        }

        enter(RunStage::Reporting);
        let report = match reference.kind {
            ReferenceKind::Track => ReconciliationReport::for_track(&tracks, &ledger),
            ReferenceKind::Album | ReferenceKind::Playlist => {
                collection_report(&output_dir, &tracks, &ledger, events).await
            }
        };
        events.progress(report.to_string()).await;

        let counts = ledger.counts();
        info!(
            "Run finished: {} downloaded, {} skipped, {} failed of {}",
            counts.downloaded, counts.skipped, counts.failed, counts.total
        );

        Ok(RunSummary {
            reference,
            name: resolved.name,
            output_dir,
            counts,
            report,
            token: credential.token().to_string(),
        })
    }
}

/// Compare the collection directory against the resolved tracks. If the
/// directory cannot be listed, only failures are reported.
async fn collection_report(
    dir: &Path,
    tracks: &[TrackDescriptor],
    ledger: &RunLedger,
    events: &EventSink,
) -> ReconciliationReport {
    match ReconciliationReport::scan(dir, tracks, ledger).await {
        Ok(report) => report,
        Err(e) => {
            events
                .diagnostic(format!("Could not compare output folder: {:#}", e))
                .await;
            ReconciliationReport::unscanned(tracks, ledger)
        }
    }
}

fn enter(stage: RunStage) {
    debug!("Run stage: {:?}", stage);
}

/// Runs the pipeline in the background, one run at a time
pub struct PipelineRunner {
    pipeline: Arc<Pipeline>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when a run ends, however it ends
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl PipelineRunner {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a run on its own task
    ///
    /// A request made while another run is active is rejected, not queued.
    pub fn spawn(
        &self,
        request: RunRequest,
        events: EventSink,
    ) -> Result<JoinHandle<Result<RunSummary, PipelineError>>, PipelineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }

        let guard = RunGuard(self.running.clone());
        let pipeline = self.pipeline.clone();

        Ok(tokio::spawn(async move {
            let _guard = guard;
            pipeline.run(request, &events).await
        }))
    }
}
