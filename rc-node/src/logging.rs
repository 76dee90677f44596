//! Per-node log-file sink (§6 "Logs"): one file per node under `logs/`,
//! each line `[HH:MM:SS.fffff] [node-abbrev] <event>`.
//!
//! Grounded on the teacher's `tracing`/`tracing-appender` stack (see
//! `gossip/src/service.rs`'s subscriber setup); the timestamp/abbrev prefix
//! is realized as a custom `FormatEvent` since the spec's exact line shape
//! doesn't match any of `tracing-subscriber`'s built-in formatters.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Formats the current time as `HH:MM:SS.fffff` (hundred-microsecond
/// resolution, five fractional digits), matching the documented log line
/// shape.
struct ClockTimer;

impl FormatTime for ClockTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let secs_today = now.as_secs() % 86_400;
        let hours = secs_today / 3600;
        let minutes = (secs_today % 3600) / 60;
        let seconds = secs_today % 60;
        let frac = now.subsec_nanos() / 10_000; // 5 fractional digits
        write!(w, "{hours:02}:{minutes:02}:{seconds:02}.{frac:05}")
    }
}

/// `[HH:MM:SS.fffff] [node-abbrev] <event>` event formatter.
struct NodeLineFormat {
    abbrev: String,
}

impl<S, N> FormatEvent<S, N> for NodeLineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[")?;
        ClockTimer.format_time(&mut writer)?;
        write!(writer, "] [{}] ", self.abbrev)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Initializes the node's log-file sink under `logs/`, returning the guard
/// that must stay alive for the lifetime of the process (dropping it stops
/// the background flush thread, matching `tracing-appender`'s contract).
pub fn init(node_abbrev: &str) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::never("logs", format!("rc_log_{node_abbrev}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(NodeLineFormat { abbrev: node_abbrev.to_string() });

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Reads back the uploaded log content for `-master LOG` delivery, saved as
/// `logs/r_log_<abbrev>.log` per §6.
pub fn save_uploaded_log(abbrev: &str, content: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    std::fs::write(format!("logs/r_log_{abbrev}.log"), content)?;
    Ok(())
}

/// Reads this node's own `logs/rc_log_<abbrev>.log`, the file `init` writes
/// to, for upload to the master on a `LOG` command.
pub fn read_local_log(abbrev: &str) -> anyhow::Result<String> {
    Ok(std::fs::read_to_string(format!("logs/rc_log_{abbrev}.log"))?)
}
