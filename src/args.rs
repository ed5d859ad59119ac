use std::path::PathBuf;

use clap::Parser;

use crate::dispatcher::{sanitize, DEFAULT_THREADS};
use crate::search_client::MAX_RESULTS;

/// Pagode is a passive Google dorking enumeration tool built on the Custom
/// Search JSON API, with key rotation and bounded concurrency.
#[derive(Parser, Debug, Clone)]
#[clap(
    author,
    version,
    about,
    long_about = "Passive Google dork enumeration over the Custom Search API. Dorks come from flags, a file or stdin; discovered links are streamed to stdout and optionally mirrored to a file."
)]
pub struct Args {
    /// Dork(s) to search with.
    #[clap(short = 'g', long = "dork", num_args = 1..)]
    pub dorks: Vec<String>,

    /// File containing a list of dorks to search, one per line.
    #[clap(short = 'l', long = "list", value_name = "FILE")]
    pub dorks_file: Option<PathBuf>,

    /// Domain to search with the "site:" operator.
    #[clap(short, long)]
    pub domain: Option<String>,

    /// File to mirror discovered links to.
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Config file holding the API keys.
    /// Defaults to `<config dir>/pagode/config.yaml`.
    #[clap(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// HTTP(S)/SOCKS5 proxy to send requests through.
    #[clap(short, long)]
    pub proxy: Option<String>,

    /// Maximum number of results per search (the API stops at 100).
    #[clap(short = 'm', long = "max", value_name = "NUM", default_value_t = MAX_RESULTS)]
    pub max_results: usize,

    /// Number of concurrent searches.
    #[clap(short, long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Show only results in output.
    #[clap(long)]
    pub silent: bool,

    /// Show verbose output.
    #[clap(short, long)]
    pub verbose: bool,

    /// Disable color in output.
    #[clap(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    /// Dorks given on the command line, sanitized, with blanks dropped.
    pub fn sanitized_dorks(&self) -> Vec<String> {
        self.dorks
            .iter()
            .map(|dork| sanitize(dork))
            .filter(|dork| !dork.is_empty())
            .collect()
    }
}
