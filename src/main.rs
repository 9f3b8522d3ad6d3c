use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use cartoon2rss::config::{DEFAULT_OUTPUT, DEFAULT_SOURCE_URL, DEFAULT_TIMEOUT_SECS};
use cartoon2rss::output::append_ci_outputs;
use cartoon2rss::{logging, Environment, FeedError, HttpFetcher, RunReport, Settings};

/// cartoon2rss - publish the cartoons on a web page as an RSS feed
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page to scrape for cartoons
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    url: String,

    /// Where to write the feed
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Log progress, not just errors
    #[arg(short, long)]
    verbose: bool,

    /// Timeout in seconds for each fetch attempt
    #[arg(short = 't', long = "timeout-secs", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let env = Environment::capture();
    logging::init(args.verbose, env.ci);

    let settings = match Settings::new(
        &args.url,
        args.output,
        args.verbose,
        Duration::from_secs(args.timeout_secs),
        &env,
    ) {
        Ok(s) => s,
        Err(e) => return fail(&e, env.ci),
    };

    match build(&settings) {
        Ok(report) => {
            report.log_summary();
            if let Some(path) = &settings.ci.output_file {
                if let Err(e) = append_ci_outputs(path, &report.ci_outputs()) {
                    warn!(error = %e, "could not write CI outputs");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e, settings.ci.enabled),
    }
}

fn build(settings: &Settings) -> Result<RunReport, FeedError> {
    let fetcher = HttpFetcher::new(settings.fetch.clone())?;
    cartoon2rss::run(settings, &fetcher, Utc::now(), &mut rand::thread_rng())
}

fn fail(e: &FeedError, ci: bool) -> ExitCode {
    error!("feed generation failed: {}", e);
    let mut cause = std::error::Error::source(e);
    while let Some(inner) = cause {
        info!("  caused by: {}", inner);
        cause = inner.source();
    }
    if ci {
        println!("::error title=Feed generation failed::{}", e);
    }
    ExitCode::from(1)
}
