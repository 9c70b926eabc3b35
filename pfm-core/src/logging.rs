//! src/logging.rs
//! ============================================================================
//! Tracing setup: a daily rolling file under the log directory plus a stderr
//! layer, both formatted as `[SEQ] LEVEL [file:line module] message`.

use std::{
    fs,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{Context, Result};
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, daily};
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    prelude::*,
};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub file_prefix: String,
    /// Default directive when `RUST_LOG` is unset, e.g. `info` or `pfm_core=debug`.
    pub level: String,
    pub stderr: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_prefix: "pfm".to_string(),
            level: "info".to_string(),
            stderr: false,
        }
    }
}

pub struct Logger;

impl Logger {
    /// Call **once** near the start of `main`.
    pub fn init_tracing(config: &LoggerConfig) -> Result<()> {
        fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("cannot create log dir {}", config.log_dir.display())
        })?;

        let directive: Directive = config
            .level
            .parse()
            .with_context(|| format!("invalid log level '{}'", config.level))?;
        let make_filter = || EnvFilter::from_default_env().add_directive(directive.clone());

        // daily rolling file appender → logs/pfm.YYYY-MM-DD
        let file: RollingFileAppender = daily(&config.log_dir, &config.file_prefix);

        let file_layer = fmt::layer()
            .event_format(SeqFileMod)
            .with_writer(file)
            .with_ansi(false)
            .with_filter(make_filter());

        // optional stderr layer for live debugging
        let stderr_layer = config.stderr.then(|| {
            fmt::layer()
                .event_format(SeqFileMod)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_filter(make_filter())
        });

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .context("Failed to install global tracing subscriber")?;

        Ok(())
    }
}

static SEQ: AtomicUsize = AtomicUsize::new(1);

/// Custom formatter: `[SEQ] LEVEL [file:line mod::path] message`
struct SeqFileMod;

impl<S, N> FormatEvent<S, N> for SeqFileMod
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut w: Writer<'_>,
        ev: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        // monotonically-increasing sequence number
        let seq: usize = SEQ.fetch_add(1, Ordering::Relaxed);

        let meta: &'static Metadata<'static> = ev.metadata();
        write!(
            w,
            "{seq:06} {:5} [{}:{} {}] ",
            meta.level(),
            meta.file().unwrap_or("??"),
            meta.line().unwrap_or(0),
            meta.module_path().unwrap_or("???"),
        )?;

        ctx.field_format().format_fields(w.by_ref(), ev)?;
        writeln!(w)
    }
}
