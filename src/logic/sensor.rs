//! Sensor
//!
//! Bounded intake queue in front of a worker pool. Each request is
//! classified and persisted on a blocking thread; at most `workers`
//! requests are in flight at once. Outcomes are reported on an event
//! channel that the caller must drain.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::logic::audit::AuditStore;
use crate::logic::request::{Request, ThreatMap};
use crate::logic::threat::{ClassifyError, Phase, PipelineStats, ThreatClassifier};

/// Outcome of one submitted request
#[derive(Debug, Clone)]
pub enum SensorEvent {
    Stored {
        id: i64,
        phase: Phase,
        threats: ThreatMap,
    },
    /// Producer sent a malformed request
    Rejected { origin: String, error: ClassifyError },
    /// Classified but could not be persisted
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor is shut down")]
    Closed,
    #[error("intake queue is full")]
    QueueFull,
}

/// Classify + persist, run on a blocking worker thread
struct Worker {
    classifier: Arc<ThreatClassifier>,
    store: Arc<AuditStore>,
}

impl Worker {
    fn process(&self, mut req: Request) -> SensorEvent {
        let classification = match self.classifier.classify(&mut req) {
            Ok(c) => c,
            Err(error) => {
                log::warn!("Rejected request from {}: {}", req.origin, error);
                return SensorEvent::Rejected {
                    origin: req.origin,
                    error,
                };
            }
        };

        match self.store.persist(&mut req) {
            Ok(id) => SensorEvent::Stored {
                id,
                phase: classification.phase,
                threats: classification.threats,
            },
            Err(e) => {
                log::error!(
                    "Failed to persist {} {} from {}: {}",
                    req.method,
                    req.request,
                    req.origin,
                    e
                );
                SensorEvent::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

pub struct Sensor {
    intake: mpsc::Sender<Request>,
    dispatcher: JoinHandle<()>,
    classifier: Arc<ThreatClassifier>,
}

impl Sensor {
    /// Start the dispatcher. `workers` and `queue_capacity` are clamped to 1.
    pub fn start(
        classifier: Arc<ThreatClassifier>,
        store: Arc<AuditStore>,
        workers: usize,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<SensorEvent>) {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);

        let (intake_tx, intake_rx) = mpsc::channel(queue_capacity);
        let (event_tx, event_rx) = mpsc::channel(queue_capacity);

        let worker = Arc::new(Worker {
            classifier: Arc::clone(&classifier),
            store,
        });
        let dispatcher = tokio::spawn(dispatch(intake_rx, worker, workers, event_tx));

        log::info!(
            "Sensor started: {} workers, queue capacity {}",
            workers,
            queue_capacity
        );

        (
            Self {
                intake: intake_tx,
                dispatcher,
                classifier,
            },
            event_rx,
        )
    }

    /// Queue a request, waiting for space if the queue is full
    pub async fn submit(&self, req: Request) -> Result<(), SensorError> {
        self.intake.send(req).await.map_err(|_| SensorError::Closed)
    }

    /// Queue a request or drop it immediately if the queue is full
    pub fn try_submit(&self, req: Request) -> Result<(), SensorError> {
        self.intake.try_send(req).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SensorError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SensorError::Closed,
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.classifier.stats()
    }

    /// Stop intake, wait for in-flight requests, return final counters
    pub async fn shutdown(self) -> PipelineStats {
        drop(self.intake);
        if let Err(e) = self.dispatcher.await {
            log::error!("Sensor dispatcher failed: {}", e);
        }
        let stats = self.classifier.stats();
        self.classifier.fallback().log_scorer_latency();
        log::info!(
            "Sensor stopped: {} classified, {} rejected",
            stats.classified,
            stats.rejected
        );
        stats
    }
}

async fn dispatch(
    mut intake: mpsc::Receiver<Request>,
    worker: Arc<Worker>,
    workers: usize,
    events: mpsc::Sender<SensorEvent>,
) {
    let permits = Arc::new(Semaphore::new(workers));

    while let Some(req) = intake.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let worker = Arc::clone(&worker);
        let events = events.clone();

        tokio::spawn(async move {
            let event = match tokio::task::spawn_blocking(move || worker.process(req)).await {
                Ok(event) => event,
                Err(e) => SensorEvent::Failed {
                    error: format!("worker task failed: {}", e),
                },
            };
            // Receiver gone means nobody is listening; the record is already stored
            let _ = events.send(event).await;
            drop(permit);
        });
    }

    // Drain: every permit back means every worker finished
    let _ = permits.acquire_many(workers as u32).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::logic::model::FallbackAdapter;
    use crate::logic::request::{Location, ThreatLabel};
    use crate::logic::signature::SignatureEngine;

    fn sensor(
        dir: &tempfile::TempDir,
        workers: usize,
    ) -> (Sensor, mpsc::Receiver<SensorEvent>, Arc<AuditStore>) {
        let engine = SignatureEngine::builtin().expect("builtin signatures compile");
        let classifier = Arc::new(ThreatClassifier::new(
            engine,
            FallbackAdapter::always_valid(Duration::from_millis(200)),
        ));
        let store = Arc::new(
            AuditStore::open(&dir.path().join("log.db"), &dir.path().join("snapshots"))
                .expect("open store"),
        );
        let (sensor, events) = Sensor::start(classifier, Arc::clone(&store), workers, 16);
        (sensor, events, store)
    }

    async fn collect(mut events: mpsc::Receiver<SensorEvent>) -> Vec<SensorEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_requests_classified_and_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (sensor, events, store) = sensor(&dir, 4);

        sensor
            .submit(Request::new("10.0.0.1", "h", "GET", "/?q=<script>alert(1)</script>"))
            .await
            .expect("submit");
        sensor
            .submit(Request::new("10.0.0.2", "h", "GET", "/about"))
            .await
            .expect("submit");
        sensor
            .submit(Request::new("10.0.0.3", "h", "G E T", "/about"))
            .await
            .expect("submit");

        let stats = sensor.shutdown().await;
        let events = collect(events).await;

        assert_eq!(events.len(), 3);
        assert_eq!(stats.classified, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(store.count().expect("count"), 2);

        let stored: Vec<&ThreatMap> = events
            .iter()
            .filter_map(|e| match e {
                SensorEvent::Stored { threats, .. } => Some(threats),
                _ => None,
            })
            .collect();
        assert_eq!(stored.len(), 2);
        assert!(stored
            .iter()
            .any(|t| t.get(&ThreatLabel::Xss) == Some(&Location::Request)));
        assert!(stored
            .iter()
            .any(|t| t.get(&ThreatLabel::Valid) == Some(&Location::Unattributed)));
        assert!(events.iter().any(|e| matches!(
            e,
            SensorEvent::Rejected { origin, error: ClassifyError::InvalidRequest(_) }
                if origin == "10.0.0.3"
        )));
    }

    #[tokio::test]
    async fn test_single_worker_processes_burst() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (sensor, events, store) = sensor(&dir, 0);

        for i in 0..10 {
            sensor
                .submit(Request::new("10.0.0.1", "h", "GET", format!("/page/{i}")))
                .await
                .expect("submit");
        }

        let stats = sensor.shutdown().await;
        let events = collect(events).await;

        assert_eq!(events.len(), 10);
        assert_eq!(stats.classified, 10);
        assert_eq!(store.count().expect("count"), 10);

        let mut ids: Vec<i64> = events
            .iter()
            .filter_map(|e| match e {
                SensorEvent::Stored { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }
}
