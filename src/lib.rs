//! # Pagode
//!
//! Passive Google dork enumeration over the Custom Search JSON API, with
//! bounded concurrency, API key rotation on quota errors and streaming output.
//!
//! ## Main Components
//!
//! - [`CredentialPool`]: ordered API keys with a forward-only rotation cursor
//! - [`SearchClient`]: walks result pages for one dork, rotating keys on 403/429
//! - [`Dispatcher`]: runs dorks from a line stream with at most N in flight
//! - [`ResultSink`]: newline-framed output to stdout and an optional file
//! - [`Runner`]: wires the above together from [`Args`]
//!
//! ## Example
//!
//! ```no_run
//! use pagode_lib::{Args, Runner};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let args = Args::parse();
//!     let runner = Runner::new(&args)?;
//!     let summary = runner.run_enumeration().await?;
//!     eprintln!("{} links from {} dorks", summary.links, summary.dorks);
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod credentials;
mod dispatcher;
mod error;
mod runner;
mod search_client;
mod sink;

pub use crate::args::Args;
pub use crate::config::{default_config_path, load_credentials, PROVIDER};
pub use crate::credentials::{Credential, CredentialPool};
pub use crate::dispatcher::{sanitize, Dispatcher, RunSummary, DEFAULT_THREADS};
pub use crate::error::{Error, Result};
pub use crate::runner::Runner;
pub use crate::search_client::{
    Search, SearchClient, MAX_RESULTS, RESULTS_PER_PAGE, SEARCH_ENDPOINT,
};
pub use crate::sink::ResultSink;
