//! Supervised background execution of pipeline runs.
//!
//! Uploads hand document ids to [`PipelineQueue::enqueue`], which never
//! blocks. A single supervisor task owns every run: it spawns each one into
//! a `JoinSet`, bounds how many execute at once with a semaphore, and logs
//! runs that panic. [`PipelineQueue::shutdown`] applies the configured
//! [`ShutdownPolicy`].

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc, Notify, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::config::{ShutdownPolicy, WorkerConfig};
use crate::error::WorkerError;
use crate::pipeline::{BroadcastProgress, Pipeline, RunEvent, RunOutcome};

/// Events buffered per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

pub struct PipelineQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    supervisor: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    abandon: Arc<Notify>,
    events: broadcast::Sender<RunEvent>,
    policy: ShutdownPolicy,
}

impl PipelineQueue {
    /// Spawns the supervisor. Must be called from within a tokio runtime.
    pub fn start(pipeline: Arc<Pipeline>, config: &WorkerConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let abandon = Arc::new(Notify::new());
        let max_runs = config.max_concurrent_runs.max(1);

        let supervisor = tokio::spawn(supervise(
            pipeline,
            receiver,
            Arc::new(Semaphore::new(max_runs)),
            events.clone(),
            Arc::clone(&abandon),
        ));

        info!(
            "Pipeline queue started (max {} concurrent runs, shutdown policy {:?})",
            max_runs, config.shutdown_policy
        );

        Self {
            sender: Mutex::new(Some(sender)),
            supervisor: tokio::sync::Mutex::new(Some(supervisor)),
            abandon,
            events,
            policy: config.shutdown_policy,
        }
    }

    /// Schedules a run for `document_id` without waiting for it.
    pub fn enqueue(&self, document_id: &str) -> Result<(), WorkerError> {
        let guard = self.sender.lock().map_err(|_| WorkerError::ChannelClosed)?;
        let sender = guard.as_ref().ok_or(WorkerError::ChannelClosed)?;
        sender
            .send(document_id.to_string())
            .map_err(|_| WorkerError::ChannelClosed)?;
        debug!("Queued pipeline run for {}", document_id);
        Ok(())
    }

    /// Receives progress of every run started after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    /// Stops accepting work and waits for the supervisor to exit.
    ///
    /// With [`ShutdownPolicy::Drain`] every queued run is still started and
    /// awaited. With [`ShutdownPolicy::Abandon`] in-flight runs are aborted
    /// and their records stay PROCESSING. Calling this twice is a no-op.
    pub async fn shutdown(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);

        if self.policy == ShutdownPolicy::Abandon {
            self.abandon.notify_one();
        }

        let supervisor = self.supervisor.lock().await.take();
        if let Some(handle) = supervisor {
            info!("Shutting down pipeline queue ({:?})", self.policy);
            if let Err(e) = handle.await {
                error!("Pipeline supervisor failed: {}", e);
            }
            info!("Pipeline queue stopped");
        }
    }
}

async fn supervise(
    pipeline: Arc<Pipeline>,
    mut receiver: mpsc::UnboundedReceiver<String>,
    semaphore: Arc<Semaphore>,
    events: broadcast::Sender<RunEvent>,
    abandon: Arc<Notify>,
) {
    let mut runs: JoinSet<(String, RunOutcome)> = JoinSet::new();

    loop {
        tokio::select! {
            _ = abandon.notified() => return abort_runs(&mut runs).await,
            received = receiver.recv() => match received {
                Some(document_id) => {
                    let pipeline = Arc::clone(&pipeline);
                    let semaphore = Arc::clone(&semaphore);
                    let events = events.clone();
                    runs.spawn(async move {
                        let outcome = match semaphore.acquire_owned().await {
                            Ok(_permit) => {
                                let progress = BroadcastProgress::new(&document_id, events);
                                pipeline.run(&document_id, &progress).await
                            }
                            Err(_) => RunOutcome::Skipped,
                        };
                        (document_id, outcome)
                    });
                }
                None => break,
            },
            Some(joined) = runs.join_next(), if !runs.is_empty() => log_finished(joined),
        }
    }

    debug!("Queue closed, draining {} pipeline runs", runs.len());
    loop {
        tokio::select! {
            _ = abandon.notified() => return abort_runs(&mut runs).await,
            joined = runs.join_next() => match joined {
                Some(joined) => log_finished(joined),
                None => return,
            },
        }
    }
}

async fn abort_runs(runs: &mut JoinSet<(String, RunOutcome)>) {
    warn!("Abandoning {} in-flight pipeline runs", runs.len());
    runs.abort_all();
    while let Some(joined) = runs.join_next().await {
        log_finished(joined);
    }
}

fn log_finished(joined: Result<(String, RunOutcome), JoinError>) {
    match joined {
        Ok((document_id, RunOutcome::Unrecorded { error })) => {
            error!("Run for {} could not record its result: {}", document_id, error)
        }
        Ok((document_id, outcome)) => debug!("Run for {} finished: {:?}", document_id, outcome),
        Err(e) if e.is_panic() => error!("Pipeline run panicked: {}", e),
        Err(_) => debug!("Pipeline run aborted"),
    }
}
