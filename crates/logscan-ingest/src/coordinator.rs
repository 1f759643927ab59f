use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use logscan_types::Snapshot;

use crate::config::IngestConfig;
use crate::discover::discover_files;
use crate::error::IngestError;
use crate::normalize::MessageNormalizer;
use crate::parser::LineParser;
use crate::worker::{FileOutcome, IngestContext, ingest_file};

/// How long cancelled workers get to hand back their outcomes before
/// they are aborted
const CANCEL_GRACE: Duration = Duration::from_secs(5);

type WorkQueue = Arc<Mutex<VecDeque<PathBuf>>>;

/// Everything one run produced
#[derive(Debug)]
pub struct IngestReport {
    /// Frozen counters
    pub snapshot: Snapshot,

    /// One outcome per discovered file, sorted by path
    pub files: Vec<FileOutcome>,

    /// Wall time from discovery to snapshot
    pub elapsed: Duration,

    /// The shutdown timeout fired before every worker finished
    pub timed_out: bool,
}

impl IngestReport {
    pub fn complete_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_complete()).count()
    }

    pub fn partial_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_partial()).count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }
}

/// Runs the ingest phase: discover files, fan them out over a fixed pool
/// of workers, join every worker, snapshot the counters.
pub struct IngestCoordinator {
    config: IngestConfig,
    parser: LineParser,
    normalizer: MessageNormalizer,
    cancel: CancellationToken,
}

impl IngestCoordinator {
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            config,
            parser: LineParser::new()?,
            normalizer: MessageNormalizer::new()?,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops every in-flight and queued file when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ingest every regular file under `root`.
    ///
    /// Only enumeration of the root itself can fail; per-file problems are
    /// reported in [`IngestReport::files`].
    pub async fn run(&self, root: &Path) -> Result<IngestReport, IngestError> {
        let started = Instant::now();
        let files = discover_files(root).await?;
        let discovered = files.len();

        let ctx = Arc::new(IngestContext::new(
            self.parser.clone(),
            self.normalizer.clone(),
        ));
        let queue: WorkQueue = Arc::new(Mutex::new(files.iter().cloned().collect()));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<FileOutcome>();
        let cancel = self.cancel.child_token();

        // No point in idle workers
        let pool_size = self.config.workers.min(discovered).max(1);
        info!(
            root = %root.display(),
            files = discovered,
            workers = pool_size,
            "starting ingest"
        );

        let mut pool = JoinSet::new();
        for worker_id in 0..pool_size {
            pool.spawn(run_worker(
                worker_id,
                Arc::clone(&ctx),
                Arc::clone(&queue),
                outcome_tx.clone(),
                self.config.file_timeout,
                cancel.clone(),
            ));
        }
        drop(outcome_tx);

        let timed_out = time::timeout(self.config.shutdown_timeout, join_workers(&mut pool))
            .await
            .is_err();

        if timed_out {
            warn!(
                timeout = ?self.config.shutdown_timeout,
                remaining = pool.len(),
                "ingest did not finish in time, cancelling remaining work"
            );
            cancel.cancel();
            if time::timeout(CANCEL_GRACE, join_workers(&mut pool))
                .await
                .is_err()
            {
                warn!(remaining = pool.len(), "aborting unresponsive workers");
                pool.shutdown().await;
            }
        }

        // Every worker is gone; nothing writes to the store past this point
        let snapshot = ctx.store().snapshot();

        let mut outcomes = Vec::with_capacity(discovered);
        while let Ok(outcome) = outcome_rx.try_recv() {
            outcomes.push(outcome);
        }

        // Files still queued, or lost with an aborted worker
        let reported: HashSet<PathBuf> = outcomes.iter().map(|o| o.path.clone()).collect();
        outcomes.extend(
            files
                .into_iter()
                .filter(|path| !reported.contains(path))
                .map(FileOutcome::not_ingested),
        );
        outcomes.sort_by(|a, b| a.path.cmp(&b.path));

        let report = IngestReport {
            snapshot,
            files: outcomes,
            elapsed: started.elapsed(),
            timed_out,
        };

        info!(
            lines = report.snapshot.total_lines,
            parsed = report.snapshot.parsed_lines(),
            complete = report.complete_files(),
            partial = report.partial_files(),
            failed = report.failed_files(),
            elapsed = ?report.elapsed,
            "ingest finished"
        );

        Ok(report)
    }
}

/// Pull files off the shared queue until it is empty or the run is cancelled
async fn run_worker(
    worker_id: usize,
    ctx: Arc<IngestContext>,
    queue: WorkQueue,
    outcome_tx: mpsc::UnboundedSender<FileOutcome>,
    file_timeout: Option<Duration>,
    cancel: CancellationToken,
) {
    let mut handled = 0usize;

    while !cancel.is_cancelled() {
        let next = queue.lock().pop_front();
        let Some(path) = next else {
            break;
        };

        let outcome = ingest_file(&path, &ctx, file_timeout, &cancel).await;
        handled += 1;

        if outcome_tx.send(outcome).is_err() {
            break;
        }
    }

    debug!(worker = worker_id, files = handled, "worker finished");
}

/// Completion barrier: wait for every worker task
async fn join_workers(pool: &mut JoinSet<()>) {
    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                error!(error = %e, "ingest worker panicked");
            }
        }
    }
}
