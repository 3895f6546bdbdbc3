mod cache;
mod checker;
mod config;
mod diagnostics;
mod error;
mod extract;
mod slug;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::diagnostics::Format;
use crate::error::Error;

/// Exit status when the scan completed and found broken links.
const EXIT_BROKEN_LINKS: u8 = 127;

/// Environment variable holding the tracing filter directive.
const LOG_ENV: &str = "MDLINKS_LOG";

#[derive(Parser)]
#[command(
    name = "mdlinks",
    version,
    about = "Verify cross-document links and heading anchors in markdown files"
)]
struct Cli {
    /// Directory to scan; it is the root for absolute links
    #[arg(short = 'd', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// Output format for broken links
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Glob pattern matched against file base names [default: *.md]
    #[arg(short = 'p', long = "pattern")]
    pattern: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::BrokenLinks { links }) => {
            match diagnostics::render_broken_links(&links, cli.format) {
                Ok(out) => print!("{out}"),
                Err(e) => {
                    diagnostics::print_error(&e);
                    return ExitCode::FAILURE;
                },
            }
            ExitCode::from(EXIT_BROKEN_LINKS)
        },
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}

/// Load config from the scan root and check every matching file.
///
/// # Errors
///
/// Returns `Error::BrokenLinks` when violations are found, or any fatal error.
fn run(cli: &Cli) -> Result<(), Error> {
    let config = config::Config::load(&cli.dir)?;
    let pattern = config.pattern(cli.pattern.as_deref());
    tracing::debug!(root = %cli.dir.display(), pattern, "starting scan");
    checker::check(&cli.dir, pattern, &config)
}

/// Log to stderr, filtered by `MDLINKS_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
