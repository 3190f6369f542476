//! Argument parsing, telemetry setup and batch execution.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use trove_archive::error_chain;
use trove_batch::BatchOrchestrator;
use trove_config::{
    BatchSettings, ConfigError, DEFAULT_CONCURRENCY, DEFAULT_DESTINATION_ROOT, DEFAULT_FORMAT,
    DEFAULT_SOURCE_ROOT,
};
use trove_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, Metrics, init_logging};

use crate::error::{CliError, CliResult};
use crate::output::{BatchSummary, OutputFormat, render_summary};

/// Parses CLI arguments, installs logging, runs the batch and prints the
/// summary. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let result = match init_telemetry(&cli) {
        Ok(()) => execute(&cli, &mut io::stdout()).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "trove",
    version,
    about = "Archive <source>/<date>/<name> directories into per-name tar.gz or zip files"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        visible_alias = "archive-src",
        env = "TROVE_SOURCE",
        default_value = DEFAULT_SOURCE_ROOT,
        help = "Directory whose children are date directories"
    )]
    pub(crate) source: PathBuf,
    #[arg(
        long,
        visible_alias = "archive-dest",
        env = "TROVE_DESTINATION",
        default_value = DEFAULT_DESTINATION_ROOT,
        help = "Directory receiving <date>/<name>.<ext> archives"
    )]
    pub(crate) destination: PathBuf,
    #[arg(
        long,
        alias = "extension",
        env = "TROVE_FORMAT",
        default_value = DEFAULT_FORMAT,
        help = "Archive format: tar.gz or zip"
    )]
    pub(crate) format: String,
    #[arg(
        long,
        alias = "goroutines",
        env = "TROVE_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        allow_negative_numbers = true,
        help = "Number of date directories archived at once"
    )]
    pub(crate) concurrency: i64,
    #[arg(long, env = "TROVE_START_AT", help = "First date directory to archive")]
    pub(crate) start_at: Option<String>,
    #[arg(
        long,
        env = "TROVE_COUNT",
        allow_negative_numbers = true,
        help = "Maximum number of date directories to archive (unlimited when absent)"
    )]
    pub(crate) count: Option<i64>,
    #[arg(long, env = "TROVE_COMPRESSION_LEVEL", help = "Compression level 0-9")]
    pub(crate) compression_level: Option<u32>,
    #[arg(
        long,
        env = "TROVE_ATOMIC",
        help = "Write each archive to <dest>.partial and rename it on success"
    )]
    pub(crate) atomic: bool,
    #[arg(
        long,
        env = "TROVE_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level or filter directive; RUST_LOG takes precedence"
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        env = "TROVE_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "Log format: json or text"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[arg(long, env = "TROVE_LOG_OUTPUT", help = "Append logs to this file instead of stderr")]
    pub(crate) log_output: Option<PathBuf>,
    #[arg(
        long,
        value_enum,
        env = "TROVE_OUTPUT",
        default_value_t = OutputFormat::Table,
        help = "Summary output format"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        env = "TROVE_METRICS_OUT",
        help = "Write Prometheus text exposition to this file after the run"
    )]
    pub(crate) metrics_out: Option<PathBuf>,
}

impl Cli {
    pub(crate) fn settings(&self) -> BatchSettings {
        BatchSettings {
            source_root: self.source.clone(),
            destination_root: self.destination.clone(),
            format: self.format.clone(),
            concurrency: self.concurrency,
            start_at: self.start_at.clone(),
            limit: self.count,
            compression_level: self.compression_level,
            atomic: self.atomic,
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn describe_config_error(err: &ConfigError) -> String {
    match (err.field(), err.reason()) {
        (Some(field), Some(reason)) => format!("invalid configuration: {field} {reason}"),
        _ => format!("invalid configuration: {}", error_chain(err)),
    }
}

fn init_telemetry(cli: &Cli) -> CliResult<()> {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        file: cli.log_output.as_deref(),
    };
    init_logging(&config).map_err(|err| {
        CliError::validation(format!("failed to initialise logging: {}", error_chain(&err)))
    })
}

/// Validate settings, run the batch and render its summary to `out`.
pub(crate) async fn execute(cli: &Cli, out: &mut impl Write) -> CliResult<()> {
    let config = cli
        .settings()
        .validate()
        .map_err(|err| CliError::validation(describe_config_error(&err)))?;
    let metrics = Metrics::new().map_err(|err| {
        CliError::validation(format!("failed to initialise metrics: {}", error_chain(&err)))
    })?;

    let report = BatchOrchestrator::new(config, metrics.clone())
        .run()
        .await
        .map_err(|err| CliError::failure(anyhow!("batch aborted: {}", error_chain(&err))))?;

    render_summary(&BatchSummary::from_report(&report), cli.output, out)?;

    if let Some(path) = &cli.metrics_out {
        metrics.write_to(path).map_err(|err| {
            CliError::failure(anyhow!("failed to write metrics: {}", error_chain(&err)))
        })?;
        info!(path = %path.display(), "metrics written");
    }

    if report.succeeded() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(
            "{} archive(s) and {} date task(s) failed",
            report.failed_leaves(),
            report.failed_dates()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_test_support::archives::{list_tar_gz, list_zip, names};
    use trove_test_support::fixtures::BatchLayout;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("trove").chain(args.iter().copied())).unwrap()
    }

    fn layout_args(layout: &BatchLayout) -> Vec<String> {
        vec![
            "--source".into(),
            layout.source_root().display().to_string(),
            "--destination".into(),
            layout.destination_root().display().to_string(),
        ]
    }

    fn parse_owned(args: &[String]) -> Cli {
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        parse(&borrowed)
    }

    #[test]
    fn defaults_match_baseline_tool() {
        let cli = parse(&[]);
        let settings = cli.settings();
        assert_eq!(settings, BatchSettings::default());
        assert_eq!(cli.output, OutputFormat::Table);
        assert_eq!(cli.log_level, DEFAULT_LOG_LEVEL);
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn legacy_flag_names_are_accepted() {
        let cli = parse(&[
            "--archive-src",
            "/data/in",
            "--archive-dest",
            "/data/out",
            "--extension",
            "zip",
            "--goroutines",
            "4",
            "--start-at",
            "2024-01-02",
            "--count",
            "3",
        ]);
        let settings = cli.settings();
        assert_eq!(settings.source_root, PathBuf::from("/data/in"));
        assert_eq!(settings.destination_root, PathBuf::from("/data/out"));
        assert_eq!(settings.format, "zip");
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.start_at.as_deref(), Some("2024-01-02"));
        assert_eq!(settings.limit, Some(3));
    }

    #[test]
    fn log_format_accepts_text_alias() {
        assert_eq!(parse(&["--log-format", "text"]).log_format, Some(LogFormat::Pretty));
        assert_eq!(parse(&["--log-format", "json"]).log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["trove", "--log-format", "yaml"]).is_err());
    }

    #[tokio::test]
    async fn negative_concurrency_is_a_validation_error() {
        let cli = parse(&["--concurrency", "-1"]);
        let err = execute(&cli, &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("concurrency"));
    }

    #[tokio::test]
    async fn unknown_format_is_a_validation_error() {
        let layout = BatchLayout::new().unwrap();
        let mut args = layout_args(&layout);
        args.extend(["--format".into(), "rar".into()]);
        let err = execute(&parse_owned(&args), &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "invalid configuration: format unsupported");
    }

    #[tokio::test]
    async fn successful_batch_prints_summary_and_metrics() {
        let layout = BatchLayout::new().unwrap();
        layout.file("2024-01-01/alice/file.txt", b"hi").unwrap();
        layout.dir("2024-01-01/bob").unwrap();
        let metrics_path = layout.base().join("metrics.prom");

        let mut args = layout_args(&layout);
        args.extend([
            "--concurrency".into(),
            "2".into(),
            "--output".into(),
            "json".into(),
            "--metrics-out".into(),
            metrics_path.display().to_string(),
        ]);
        let mut out = Vec::new();
        execute(&parse_owned(&args), &mut out).await.unwrap();

        let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(summary["archived"], 2);
        assert_eq!(summary["rows"][0]["name"], "alice");
        assert_eq!(summary["rows"][1]["status"], "ok");

        let alice = list_tar_gz(&layout.archive_path("2024-01-01", "alice", "tar.gz")).unwrap();
        assert_eq!(names(&alice), ["alice/", "alice/file.txt"]);
        let exposition = std::fs::read_to_string(metrics_path).unwrap();
        assert!(exposition.contains("archives_total"));
    }

    #[tokio::test]
    async fn failed_leaf_maps_to_failure_exit_code() {
        let layout = BatchLayout::new().unwrap();
        layout.file("2024-01-01/alice/file.txt", b"hi").unwrap();
        layout.dir("2024-01-01/bob").unwrap();
        std::fs::create_dir_all(layout.archive_path("2024-01-01", "bob", "zip")).unwrap();

        let mut args = layout_args(&layout);
        args.extend(["--format".into(), "zip".into()]);
        let mut out = Vec::new();
        let err = execute(&parse_owned(&args), &mut out).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "1 archive(s) and 0 date task(s) failed");

        let table = String::from_utf8(out).unwrap();
        assert!(table.contains("2024-01-01/bob"));
        let alice = list_zip(&layout.archive_path("2024-01-01", "alice", "zip")).unwrap();
        assert_eq!(alice[1].text(), "hi");
    }

    #[tokio::test]
    async fn missing_source_root_is_fatal() {
        let layout = BatchLayout::new().unwrap();
        let args = vec![
            "--source".to_string(),
            layout.base().join("absent").display().to_string(),
            "--destination".to_string(),
            layout.destination_root().display().to_string(),
        ];
        let err = execute(&parse_owned(&args), &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().starts_with("batch aborted"));
    }
}
