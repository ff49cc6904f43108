use crate::cancellation::CancellationToken;
use crate::chunks::{ChunkList, ChunkStore};
use crate::measure::TextMeasurer;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SendError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct RebuildJob {
    generation: u64,
    text: Arc<str>,
    width: f32,
    cancel: CancellationToken,
}

struct RebuildOutcome {
    generation: u64,
    list: Option<ChunkList>,
}

/// The one background thread rebuilds run on, with both ends of its queues.
struct WorkerThread {
    jobs: Option<Sender<RebuildJob>>,
    results: Receiver<RebuildOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    fn spawn<M: TextMeasurer>(store: Arc<ChunkStore<M>>) -> io::Result<Self> {
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (results_tx, results_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("chunk-rebuild".to_string())
            .spawn(move || run_jobs(&store, &jobs_rx, &results_tx))?;
        debug!("Started chunk rebuild thread");
        Ok(Self {
            jobs: Some(jobs_tx),
            results: results_rx,
            handle: Some(handle),
        })
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        // Closing the queue ends the job loop once the current job returns.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Chunk rebuild thread panicked");
            }
        }
    }
}

fn run_jobs<M: TextMeasurer>(
    store: &ChunkStore<M>,
    jobs: &Receiver<RebuildJob>,
    results: &Sender<RebuildOutcome>,
) {
    while let Ok(mut job) = jobs.recv() {
        while let Ok(newer) = jobs.try_recv() {
            job = newer;
        }
        if job.cancel.is_cancelled() {
            continue;
        }
        let generation = job.generation;
        let list = store
            .rebuild_cancellable(job.text, job.width, &job.cancel)
            .map(|list| list.with_generation(generation));
        if results.send(RebuildOutcome { generation, list }).is_err() {
            break;
        }
    }
    debug!("Chunk rebuild thread exiting");
}

/// Runs chunk rebuilds on a single background thread and hands back finished
/// lists.
///
/// Each request gets a new generation and cancels the one before it. Only an
/// outcome carrying the latest generation is ever returned. Dropping the
/// worker cancels the running rebuild and waits for the thread to stop.
pub(crate) struct RebuildWorker<M> {
    store: Arc<ChunkStore<M>>,
    thread: Option<WorkerThread>,
    generation: u64,
    in_flight: Option<CancellationToken>,
    lost: bool,
}

impl<M: TextMeasurer> RebuildWorker<M> {
    pub(crate) fn new(store: Arc<ChunkStore<M>>) -> Self {
        Self {
            store,
            thread: None,
            generation: 0,
            in_flight: None,
            lost: false,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start rebuilding `text` at `width`, superseding any running request.
    ///
    /// Returns the request's generation, or `None` if no rebuild thread could
    /// be started.
    pub(crate) fn submit(&mut self, text: Arc<str>, width: f32) -> Option<u64> {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
            debug!(superseded = self.generation, "Cancelled in-flight chunk rebuild");
        }
        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let mut job = RebuildJob {
            generation,
            text,
            width,
            cancel: cancel.clone(),
        };

        // A thread that died on an earlier job gets one restart.
        for _ in 0..2 {
            let jobs = match self.ensure_thread() {
                Some(jobs) => jobs,
                None => return None,
            };
            match jobs.send(job) {
                Ok(()) => {
                    self.in_flight = Some(cancel);
                    self.lost = false;
                    debug!(generation, width, "Queued chunk rebuild");
                    return Some(generation);
                }
                Err(SendError(returned)) => {
                    warn!("Chunk rebuild thread is gone; restarting it");
                    self.thread = None;
                    job = returned;
                }
            }
        }
        None
    }

    fn ensure_thread(&mut self) -> Option<&Sender<RebuildJob>> {
        if self.thread.is_none() {
            match WorkerThread::spawn(Arc::clone(&self.store)) {
                Ok(thread) => self.thread = Some(thread),
                Err(err) => {
                    warn!("Failed to spawn chunk rebuild thread: {err}");
                    return None;
                }
            }
        }
        self.thread.as_ref().and_then(|thread| thread.jobs.as_ref())
    }

    /// True once after the latest request ended without a list.
    pub(crate) fn take_lost(&mut self) -> bool {
        std::mem::take(&mut self.lost)
    }

    /// Latest finished list, if the current request has completed.
    pub(crate) fn try_latest(&mut self) -> Option<ChunkList> {
        let mut latest = None;
        loop {
            let received = match self.thread.as_ref() {
                Some(thread) => thread.results.try_recv(),
                None => Err(TryRecvError::Disconnected),
            };
            match received {
                Ok(outcome) => {
                    if let Some(list) = self.accept(outcome) {
                        latest = Some(list);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.thread_died();
                    break;
                }
            }
        }
        latest
    }

    /// Block up to `timeout` for the current request to finish.
    pub(crate) fn wait_latest(&mut self, timeout: Duration) -> Option<ChunkList> {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let received = match self.thread.as_ref() {
                Some(thread) => thread.results.recv_timeout(remaining),
                None => Err(RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(outcome) => {
                    if let Some(list) = self.accept(outcome) {
                        return Some(list);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!(generation = self.generation, "Timed out waiting for chunk rebuild");
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.thread_died();
                    return None;
                }
            }
        }
        None
    }

    fn accept(&mut self, outcome: RebuildOutcome) -> Option<ChunkList> {
        if outcome.generation != self.generation {
            debug!(
                generation = outcome.generation,
                latest = self.generation,
                "Discarding superseded chunk rebuild"
            );
            return None;
        }
        self.in_flight = None;
        if outcome.list.is_none() {
            self.lost = true;
        }
        outcome.list
    }

    fn thread_died(&mut self) {
        if self.thread.take().is_none() {
            return;
        }
        warn!(generation = self.generation, "Chunk rebuild thread stopped unexpectedly");
        if self.in_flight.take().is_some() {
            self.lost = true;
        }
    }
}

impl<M> Drop for RebuildWorker<M> {
    fn drop(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
            debug!(generation = self.generation, "Cancelled chunk rebuild on shutdown");
        }
    }
}
