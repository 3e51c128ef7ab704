use crate::pipeline::Pipeline;
use crate::results::{PageRecord, PageRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// How the worker pool runs the request list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    pub max_concurrency: usize,
    /// Pause after each successful page
    pub delay: Option<Duration>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            delay: None,
        }
    }
}

impl WorkerOptions {
    /// Number of workers actually spawned
    ///
    /// A configured delay serializes the run so that pauses are between
    /// requests rather than per worker.
    pub fn effective_concurrency(&self) -> usize {
        if self.delay.is_some() {
            1
        } else {
            self.max_concurrency.max(1)
        }
    }
}

/// Process every request through the pipeline and stream the records back
///
/// Records arrive in completion order; the receiver closes once every
/// worker has drained the queue.
pub async fn start(
    pipeline: Arc<Pipeline>,
    requests: Vec<PageRequest>,
    options: WorkerOptions,
) -> mpsc::Receiver<PageRecord> {
    let total = requests.len();
    let num_workers = options.effective_concurrency().min(total.max(1));
    ::log::info!(
        "Processing {} pages with {} workers (delay {:?})",
        total,
        num_workers,
        options.delay
    );

    let (queue_tx, queue_rx) = mpsc::channel::<PageRequest>(total.max(1));
    let (result_tx, result_rx) = mpsc::channel::<PageRecord>(total.max(1));

    for request in requests {
        // capacity covers the whole list, so this never waits
        if queue_tx.send(request).await.is_err() {
            ::log::error!("Request queue closed before all pages were queued");
            break;
        }
    }
    // workers stop once the queue is drained
    drop(queue_tx);

    let queue_rx = Arc::new(Mutex::new(queue_rx));

    for worker_id in 0..num_workers {
        spawn_worker(
            worker_id,
            Arc::clone(&pipeline),
            Arc::clone(&queue_rx),
            result_tx.clone(),
            options.delay,
        );
    }

    // the receiver closes when the last worker drops its sender
    drop(result_tx);

    result_rx
}

fn spawn_worker(
    worker_id: usize,
    pipeline: Arc<Pipeline>,
    queue_rx: Arc<Mutex<mpsc::Receiver<PageRequest>>>,
    result_tx: mpsc::Sender<PageRecord>,
    delay: Option<Duration>,
) {
    ::log::trace!("Spawning worker {}", worker_id);

    tokio::spawn(async move {
        ::log::debug!("Worker {} started", worker_id);
        let mut processed = 0usize;

        while let Some(request) = next_request(worker_id, &queue_rx).await {
            let record = pipeline.process(&request).await;
            let succeeded = record.success;
            processed += 1;

            if result_tx.send(record).await.is_err() {
                ::log::warn!(
                    "Worker {} stopping: result receiver was dropped",
                    worker_id
                );
                break;
            }

            if succeeded {
                if let Some(delay) = delay {
                    ::log::debug!("Worker {} sleeping {:?}", worker_id, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        ::log::debug!("Worker {} finished after {} pages", worker_id, processed);
    });
}

async fn next_request(
    worker_id: usize,
    queue_rx: &Arc<Mutex<mpsc::Receiver<PageRequest>>>,
) -> Option<PageRequest> {
    let request = queue_rx.lock().await.recv().await;
    match &request {
        Some(request) => ::log::trace!("Worker {} processing: {}", worker_id, request.url),
        None => ::log::debug!("Worker {} found the queue empty", worker_id),
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::Strategy;
    use crate::pipeline::testing::{MockLoader, NoArticle, pipeline};
    use std::collections::HashSet;

    const PAGE: &str = "<article><h1>Hi</h1><p>World</p></article>";

    fn requests(urls: &[&str]) -> Vec<PageRequest> {
        urls.iter().map(|url| PageRequest::new(*url)).collect()
    }

    async fn collect(mut rx: mpsc::Receiver<PageRecord>) -> Vec<PageRecord> {
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_effective_concurrency() {
        let options = WorkerOptions::default();
        assert_eq!(options.effective_concurrency(), 5);

        let delayed = WorkerOptions {
            max_concurrency: 8,
            delay: Some(Duration::from_millis(10)),
        };
        assert_eq!(delayed.effective_concurrency(), 1);

        let zero = WorkerOptions {
            max_concurrency: 0,
            delay: None,
        };
        assert_eq!(zero.effective_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_every_request_yields_one_record() {
        let fast = MockLoader::page(Strategy::Fast, Some(200), PAGE);
        let rendered = MockLoader::failing(Strategy::Rendered);
        let pipeline = Arc::new(pipeline(Some(fast.clone()), rendered, Arc::new(NoArticle)));
        let urls = [
            "https://example.test/1",
            "https://example.test/2",
            "https://example.test/3",
            "https://example.test/4",
            "https://example.test/5",
            "https://example.test/6",
        ];

        let rx = start(pipeline, requests(&urls), WorkerOptions::default()).await;
        let records = collect(rx).await;

        assert_eq!(records.len(), urls.len());
        assert!(records.iter().all(|record| record.success));
        let seen: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(seen, urls.iter().copied().collect());
        assert_eq!(fast.calls(), urls.len());
    }

    #[tokio::test]
    async fn test_failures_are_records_too() {
        let fast = MockLoader::failing(Strategy::Fast);
        let rendered = MockLoader::failing(Strategy::Rendered);
        let pipeline = Arc::new(pipeline(Some(fast), rendered, Arc::new(NoArticle)));

        let rx = start(
            pipeline,
            requests(&["https://example.test/1", "not a url"]),
            WorkerOptions::default(),
        )
        .await;
        let records = collect(rx).await;

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| !record.success));
    }

    #[tokio::test]
    async fn test_delay_runs_sequentially() {
        let fast = MockLoader::page(Strategy::Fast, Some(200), PAGE);
        let rendered = MockLoader::failing(Strategy::Rendered);
        let pipeline = Arc::new(pipeline(Some(fast), rendered, Arc::new(NoArticle)));
        let urls = ["https://example.test/1", "https://example.test/2", "https://example.test/3"];
        let options = WorkerOptions {
            max_concurrency: 5,
            delay: Some(Duration::from_millis(20)),
        };

        let started = std::time::Instant::now();
        let records = collect(start(pipeline, requests(&urls), options).await).await;

        // single worker, so records keep queue order
        let order: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(order, urls);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_empty_request_list_closes() {
        let pipeline = Arc::new(pipeline(
            None,
            MockLoader::failing(Strategy::Rendered),
            Arc::new(NoArticle),
        ));

        let records = collect(start(pipeline, Vec::new(), WorkerOptions::default()).await).await;
        assert!(records.is_empty());
    }
}
