//! E2E test runner entry point
//!
//! Run with: cargo run --package conduit-e2e -- --config crates/e2e/conduit-e2e.yaml

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use conduit_e2e::playwright::Browser;
use conduit_e2e::{E2eResult, RunFilter, SuiteConfig, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "conduit-e2e")]
#[command(about = "E2E test runner for the Conduit web app")]
struct Args {
    /// Path to the suite configuration
    #[arg(short, long, default_value = "conduit-e2e.yaml")]
    config: PathBuf,

    /// Run only the suite with this name
    #[arg(short, long)]
    suite: Option<String>,

    /// Run only test cases with this name
    #[arg(short, long)]
    test: Option<String>,

    /// Run only suites carrying this tag
    #[arg(long)]
    tag: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Disable video recording
    #[arg(long)]
    no_video: bool,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = SuiteConfig::load(&args.config, |key| std::env::var(key).ok())?;

    if let Some(browser) = args.browser {
        config.browser = browser;
    }
    if args.headed {
        config.headless = false;
    }
    if args.no_video {
        config.video = false;
    }
    if let Some(output) = args.output {
        // Relative to where the runner was invoked, not to the config file
        config.output_dir = std::env::current_dir()?.join(output);
    }

    let filter = RunFilter {
        suite: args.suite,
        test: args.test,
        tag: args.tag,
    };

    let mut runner = TestRunner::new(config)?;
    let results = runner.run(&filter).await?;
    runner.write_results(&results)?;

    Ok(results.failed == 0)
}
