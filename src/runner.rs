use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::config;
use crate::dispatcher::{Dispatcher, RunSummary};
use crate::error::{Error, Result};
use crate::search_client::SearchClient;
use crate::sink::ResultSink;
use crate::Args;

/// Where a run reads its dorks from.
#[derive(Debug, PartialEq, Eq)]
enum DorkSource<'a> {
    Flags(&'a [String]),
    List(&'a Path),
    Stdin,
}

/// Wires the credential pool, search client and dispatcher together from the
/// command line and picks where dorks are read from.
pub struct Runner {
    client: SearchClient,
    threads: usize,
    domain: Option<String>,
    progress: ProgressBar,
    dorks: Vec<String>,
    dorks_file: Option<PathBuf>,
    output: Option<PathBuf>,
    stdin: bool,
}

impl Runner {
    /// Load credentials and build the client. Fails before any search when
    /// the config holds no usable key.
    pub fn new(args: &Args) -> Result<Self> {
        let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
        let pool = config::load_credentials(&config_path)?;
        info!("Loaded {} API key(s)", pool.len());

        let client = SearchClient::new(Arc::new(pool), args.proxy.as_deref())?
            .with_max_results(args.max_results);

        let progress = if args.silent {
            ProgressBar::hidden()
        } else {
            spinner()
        };

        Ok(Runner {
            client,
            threads: args.threads,
            domain: args.domain.clone(),
            progress,
            dorks: args.sanitized_dorks(),
            dorks_file: args.dorks_file.clone(),
            output: args.output.clone(),
            stdin: !std::io::stdin().is_terminal(),
        })
    }

    /// Send searches to a different API root.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.client = self.client.with_endpoint(endpoint);
        self
    }

    /// Enumerate dorks from flags, else the list file, else piped stdin.
    pub async fn run_enumeration(&self) -> Result<RunSummary> {
        let Some(source) = self.source() else {
            warn!("No dorks provided, use -g, -l or pipe them on stdin");
            return Ok(RunSummary::default());
        };

        let dispatcher = Dispatcher::new(Arc::new(self.client.clone()), self.threads)
            .with_domain(self.domain.as_deref())
            .with_progress(self.progress.clone());

        match source {
            DorkSource::Flags(dorks) => {
                let joined = dorks.join("\n");
                dispatcher.run(joined.as_bytes(), self.sink().await?).await
            }
            DorkSource::List(path) => {
                let file = File::open(path).await.map_err(Error::Input)?;
                dispatcher.run(BufReader::new(file), self.sink().await?).await
            }
            DorkSource::Stdin => {
                dispatcher
                    .run(BufReader::new(tokio::io::stdin()), self.sink().await?)
                    .await
            }
        }
    }

    fn source(&self) -> Option<DorkSource<'_>> {
        if !self.dorks.is_empty() {
            Some(DorkSource::Flags(&self.dorks))
        } else if let Some(path) = &self.dorks_file {
            Some(DorkSource::List(path))
        } else if self.stdin {
            Some(DorkSource::Stdin)
        } else {
            None
        }
    }

    async fn sink(&self) -> Result<ResultSink> {
        let sink = ResultSink::stdout();
        match &self.output {
            Some(path) => sink.with_output_file(path).await,
            None => Ok(sink),
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} dorks done {wide_msg}")
    {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
