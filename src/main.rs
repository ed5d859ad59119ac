use clap::Parser;
use dotenv::dotenv;
use pagode_lib::{Args, Runner};
use std::error::Error;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

const BANNER: &str = r#"
                                 __
    ____  ____ _____ _____  ____/ /__
   / __ \/ __ `/ __ `/ __ \/ __  / _ \
  / /_/ / /_/ / /_/ / /_/ / /_/ /  __/
 / .___/\__,_/\__, /\____/\__,_/\___/
/_/          /____/
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.silent {
        LevelFilter::ERROR
    } else if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!args.no_color)
        .with_writer(std::io::stderr)
        .init();

    // Config files may reference variables defined in .env
    dotenv().ok();

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    let runner = match Runner::new(&args) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Program exiting: {}", e);
            return Err(e.into());
        }
    };

    runner.run_enumeration().await?;
    Ok(())
}
