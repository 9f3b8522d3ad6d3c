//! Console logging setup.

use std::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Errors only unless `verbose`;
/// `RUST_LOG` overrides either way. With `annotations` set, lines are
/// formatted as GitHub Actions workflow commands.
pub fn init(verbose: bool, annotations: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if annotations {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.event_format(GithubAnnotations))
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(layer).try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
    }
}

/// Workflow command prefix for a level.
pub fn annotation_prefix(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "::error::",
        Level::WARN => "::warning::",
        Level::INFO => "::notice::",
        _ => "::debug::",
    }
}

/// Formats each event as a single `::level::message` line.
pub struct GithubAnnotations;

impl<S, N> FormatEvent<S, N> for GithubAnnotations
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        write!(writer, "{}", annotation_prefix(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_per_level() {
        assert_eq!(annotation_prefix(&Level::ERROR), "::error::");
        assert_eq!(annotation_prefix(&Level::WARN), "::warning::");
        assert_eq!(annotation_prefix(&Level::INFO), "::notice::");
        assert_eq!(annotation_prefix(&Level::TRACE), "::debug::");
    }
}
