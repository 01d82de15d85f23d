//! Crawl controller
//!
//! Drives one run over a topic map. Pages are admitted in map order under a
//! concurrency bound, every request passes through the shared throttle, and
//! transient failures are retried with backoff. A failure on one page never
//! touches another: each page ends as exactly one record, one failure, or a
//! skip when a stop was requested before it started.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, PageFetcher};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::stop::StopSignal;
use crate::crawler::throttle::Throttle;
use crate::extract::{extract, ExtractedPage, ExtractionRules};
use crate::output::{CrawlEvent, EventSink, RunSummary};
use crate::state::{FailureKind, FetchFailure, PageRecord, PageState};
use crate::topics::{Topic, TopicMap};
use crate::PageError;
use scraper::Html;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Everything a finished run produced
#[derive(Debug, Clone, Default)]
pub struct CrawlBatch {
    /// Extracted records, in topic map order
    pub records: Vec<PageRecord>,

    /// Failed pages, in topic map order
    pub failures: Vec<FetchFailure>,

    pub summary: RunSummary,
}

/// How a single page ended
enum PageOutcome {
    Extracted(PageRecord),
    Failed(FetchFailure),
    Skipped,
}

/// A page slot in admission order
enum Slot {
    Running(Topic, JoinHandle<PageOutcome>),
    NotStarted,
}

/// Runs crawls over topic maps
pub struct Controller {
    worker: PageWorker,
    max_concurrent: usize,
}

impl Controller {
    /// Creates a controller from a validated config
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler configuration
    /// * `events` - Receives one event per page plus one per run
    /// * `stop` - Checked before every page starts and before every retry
    pub fn new(
        config: &Config,
        events: Arc<dyn EventSink>,
        stop: StopSignal,
    ) -> crate::Result<Self> {
        let rules = ExtractionRules::from_config(&config.site)?;
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;

        Ok(Self {
            worker: PageWorker {
                fetcher: PageFetcher::new(client),
                rules: Arc::new(rules),
                throttle: Arc::new(Throttle::new(config.crawler.rate_limit_delay())),
                retry: RetryPolicy::from_config(&config.crawler),
                events,
                stop,
            },
            max_concurrent: config.crawler.max_concurrent_pages.max(1) as usize,
        })
    }

    /// Returns a handle to this controller's stop signal
    pub fn stop_signal(&self) -> StopSignal {
        self.worker.stop.clone()
    }

    /// Crawls every topic in the map once
    ///
    /// Never fails as a whole: per-page problems end up in
    /// [`CrawlBatch::failures`].
    pub async fn run(&self, topics: &TopicMap) -> CrawlBatch {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut slots = Vec::with_capacity(topics.len());

        tracing::info!(
            "Starting crawl of {} topics ({} concurrent, {:.2}s between requests)",
            topics.len(),
            self.max_concurrent,
            self.worker.throttle.delay().as_secs_f64()
        );

        for topic in topics {
            if self.worker.stop.is_stop_requested() {
                slots.push(Slot::NotStarted);
                continue;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!("Admission closed for {}: {}", topic.url, e);
                    slots.push(Slot::NotStarted);
                    continue;
                }
            };

            // A stop may have arrived while waiting for a free slot
            if self.worker.stop.is_stop_requested() {
                slots.push(Slot::NotStarted);
                continue;
            }

            let worker = self.worker.clone();
            let task_topic = topic.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                worker.process(task_topic).await
            });
            slots.push(Slot::Running(topic.clone(), handle));
        }

        let mut batch = CrawlBatch::default();
        let total = slots.len();

        for (done, slot) in slots.into_iter().enumerate() {
            let outcome = match slot {
                Slot::NotStarted => PageOutcome::Skipped,
                Slot::Running(topic, handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => self.worker.fail(
                        &topic,
                        PageError::Extraction {
                            message: format!("page worker aborted: {}", e),
                        },
                        1,
                        Duration::ZERO,
                    ),
                },
            };

            match outcome {
                PageOutcome::Extracted(record) => batch.records.push(record),
                PageOutcome::Failed(failure) => batch.failures.push(failure),
                PageOutcome::Skipped => batch.summary.skipped += 1,
            }

            if (done + 1) % 10 == 0 {
                tracing::info!(
                    "Progress: {}/{} topics ({} extracted, {} failed)",
                    done + 1,
                    total,
                    batch.records.len(),
                    batch.failures.len()
                );
            }
        }

        batch.summary.attempted = topics.len();
        batch.summary.fetched = batch.records.len();
        batch.summary.failed = batch.failures.len();
        batch.summary.duration = started.elapsed();
        batch.summary.stopped = self.worker.stop.is_stop_requested();

        if batch.summary.stopped {
            tracing::warn!(
                "Stop requested: {} topics were not started",
                batch.summary.skipped
            );
        }

        self.worker
            .events
            .emit(&CrawlEvent::run_completed(&batch.summary));

        batch
    }
}

/// Per-page pipeline, cloned into each spawned task
#[derive(Clone)]
struct PageWorker {
    fetcher: PageFetcher,
    rules: Arc<ExtractionRules>,
    throttle: Arc<Throttle>,
    retry: RetryPolicy,
    events: Arc<dyn EventSink>,
    stop: StopSignal,
}

impl PageWorker {
    async fn process(&self, topic: Topic) -> PageOutcome {
        let started = Instant::now();
        let mut state = PageState::Pending;
        let mut attempts = 0u32;
        let mut last_error: Option<PageError> = None;

        let fetched = loop {
            self.throttle.wait().await;
            advance(&mut state, PageState::Throttled, &topic);

            if self.stop.is_stop_requested() {
                return match last_error.take() {
                    None => {
                        advance(&mut state, PageState::Skipped, &topic);
                        PageOutcome::Skipped
                    }
                    Some(err) => {
                        tracing::info!("Stop requested, not retrying {}", topic.url);
                        advance(&mut state, PageState::FetchFailed, &topic);
                        self.fail(&topic, err, attempts, started.elapsed())
                    }
                };
            }

            advance(&mut state, PageState::Fetching, &topic);
            attempts += 1;
            tracing::debug!(
                "Fetching {} for topic '{}' (attempt {})",
                topic.url,
                topic.name,
                attempts
            );

            match self.fetcher.fetch(&topic.url).await {
                Ok(page) => break page,
                Err(err)
                    if self.retry.should_retry(&err, attempts) && !self.stop.is_stop_requested() =>
                {
                    let backoff = self.retry.backoff_for(attempts);
                    tracing::warn!(
                        "Transient failure for {} ({}), retrying in {:?}",
                        topic.url,
                        err,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;

                    if self.stop.is_stop_requested() {
                        tracing::info!("Stop requested, not retrying {}", topic.url);
                        advance(&mut state, PageState::FetchFailed, &topic);
                        return self.fail(&topic, err, attempts, started.elapsed());
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    advance(&mut state, PageState::FetchFailed, &topic);
                    return self.fail(&topic, err, attempts, started.elapsed());
                }
            }
        };

        if fetched.final_url != topic.url {
            tracing::debug!("{} redirected to {}", topic.url, fetched.final_url);
        }

        advance(&mut state, PageState::Parsing, &topic);
        match parse_and_extract(&fetched.body, &self.rules, &mut state, &topic) {
            Ok(page) => {
                advance(&mut state, PageState::Done, &topic);
                let record = PageRecord::assemble(
                    page,
                    topic.url.clone(),
                    topic.name.clone(),
                    fetched.fetched_at,
                );
                self.events.emit(&CrawlEvent::page_succeeded(
                    &record,
                    started.elapsed(),
                    attempts,
                ));
                PageOutcome::Extracted(record)
            }
            Err(err) => {
                advance(&mut state, PageState::ExtractFailed, &topic);
                self.fail(&topic, err, attempts, started.elapsed())
            }
        }
    }

    fn fail(&self, topic: &Topic, err: PageError, attempts: u32, elapsed: Duration) -> PageOutcome {
        let failure = FetchFailure {
            topic: topic.name.clone(),
            url: topic.url.clone(),
            kind: err.kind(),
            error_detail: err.to_string(),
            attempts,
        };
        if failure.kind == FailureKind::Extraction {
            tracing::error!("Extraction fault on {}: {}", topic.url, failure.error_detail);
        }
        self.events.emit(&CrawlEvent::page_failed(&failure, elapsed));
        PageOutcome::Failed(failure)
    }
}

fn advance(state: &mut PageState, next: PageState, topic: &Topic) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal page transition {} -> {}",
        state,
        next
    );
    tracing::trace!(topic = %topic.name, from = %state, to = %next, "Page state change");
    *state = next;
}

/// Parses and extracts synchronously; the markup tree never crosses an await
fn parse_and_extract(
    body: &str,
    rules: &ExtractionRules,
    state: &mut PageState,
    topic: &Topic,
) -> Result<ExtractedPage, PageError> {
    let document = guarded(|| Html::parse_document(body))?;
    advance(state, PageState::Extracting, topic);
    guarded(|| extract(&document, rules))
}

/// Turns a panic inside `f` into an extraction error
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, PageError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| PageError::Extraction {
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
