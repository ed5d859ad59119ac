use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use indicatif::ProgressBar;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::search_client::Search;
use crate::sink::ResultSink;

/// Default number of concurrent dork searches.
pub const DEFAULT_THREADS: usize = 10;

/// Trim a dork and collapse runs of whitespace to a single space.
pub fn sanitize(dork: &str) -> String {
    dork.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What a run managed to do before the input ran out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dorks: usize,
    pub links: usize,
}

/// Holds the first error reported by any task. Later errors are dropped
/// (logged at debug) and recording never blocks.
#[derive(Debug, Default)]
struct FirstError(Mutex<Option<Error>>);

impl FirstError {
    fn record(&self, err: Error) {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(err);
        } else {
            debug!("Dropping error, one is already recorded: {}", err);
        }
    }

    fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    fn take(&self) -> Option<Error> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Error>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fans dorks read from a line stream out to a [`Search`] implementation with
/// at most `threads` searches in flight, streaming every link into a
/// [`ResultSink`].
pub struct Dispatcher<S> {
    searcher: Arc<S>,
    threads: usize,
    site: String,
    progress: ProgressBar,
}

impl<S> Dispatcher<S>
where
    S: Search + 'static,
{
    pub fn new(searcher: Arc<S>, threads: usize) -> Self {
        Dispatcher {
            searcher,
            threads: threads.max(1),
            site: String::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Restrict every dork to `domain` with the `site:` operator.
    pub fn with_domain(mut self, domain: Option<&str>) -> Self {
        self.site = match domain.map(str::trim) {
            Some(domain) if !domain.is_empty() => format!(" site:{}", domain),
            _ => String::new(),
        };
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Enumerate every dork in `reader`, writing links to `sink` as they come.
    ///
    /// The first failure (search, sink or task) stops new dorks from being
    /// scheduled; searches already running finish and their links are still
    /// written. A read error on `reader` takes precedence over everything else.
    pub async fn run<R>(&self, reader: R, mut sink: ResultSink) -> Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let semaphore = Arc::new(Semaphore::new(self.threads));
        let first_error = Arc::new(FirstError::default());
        let (results_tx, mut results_rx) = mpsc::channel::<String>(self.threads);

        let drain_error = first_error.clone();
        let drain = tokio::spawn(async move {
            let mut written: usize = 0;
            while let Some(link) = results_rx.recv().await {
                if let Err(e) = sink.write_line(&link).await {
                    drain_error.record(e);
                    return written;
                }
                written += 1;
            }
            if let Err(e) = sink.flush().await {
                drain_error.record(e);
            }
            written
        });

        let mut lines = reader.split(b'\n');
        let mut in_flight = FuturesUnordered::new();
        let mut dispatched: usize = 0;
        let mut input_error = None;

        loop {
            if first_error.is_set() {
                debug!("Error recorded, no more dorks will be scheduled");
                break;
            }

            let line = match lines.next_segment().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    input_error = Some(Error::Input(e));
                    break;
                }
            };

            // Dork lists are not always UTF-8; a stray byte shouldn't end the run.
            let dork = sanitize(&String::from_utf8_lossy(&line));
            if dork.is_empty() {
                continue;
            }
            let query = format!("{}{}", dork, self.site);

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if first_error.is_set() {
                break;
            }

            dispatched += 1;
            let searcher = self.searcher.clone();
            let results = results_tx.clone();
            let errors = first_error.clone();
            let progress = self.progress.clone();

            in_flight.push(tokio::spawn(async move {
                let _permit = permit;

                let (links, error) = match searcher.search(&query).await {
                    Ok(links) => (links, None),
                    Err(Error::CredentialsExhausted { links }) => {
                        (links, Some(Error::CredentialsExhausted { links: Vec::new() }))
                    }
                    Err(e) => (Vec::new(), Some(e)),
                };

                debug!("Found {} links for '{}'", links.len(), query);
                for link in links {
                    if results.send(link).await.is_err() {
                        // Drain stopped after a write failure.
                        break;
                    }
                }

                if let Some(e) = error {
                    debug!("Dork '{}' failed: {}", query, e);
                    errors.record(e);
                }

                progress.inc(1);
                progress.set_message(query);
            }));

            // Reap whatever has already finished so handles don't pile up on
            // long inputs.
            while let Some(Some(joined)) = in_flight.next().now_or_never() {
                if let Err(e) = joined {
                    first_error.record(Error::Task(e));
                }
            }
        }

        drop(results_tx);
        while let Some(joined) = in_flight.next().await {
            if let Err(e) = joined {
                first_error.record(Error::Task(e));
            }
        }
        let links = drain.await?;
        self.progress.finish_and_clear();

        if let Some(e) = input_error {
            return Err(e);
        }
        if let Some(e) = first_error.take() {
            return Err(e);
        }

        info!("Finished {} dorks, {} links found", dispatched, links);
        Ok(RunSummary {
            dorks: dispatched,
            links,
        })
    }
}
