use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use spdlog::sink::{RotatingFileSink, RotationPolicy, StdStream, StdStreamSink};
use spdlog::{Level, LevelFilter, Logger, LoggerBuilder};

use crate::config::{Config, LogLevel};

/// Everything at `level` or more severe.
fn level_filter(level: LogLevel) -> LevelFilter {
    LevelFilter::MoreSevereEqual(match level {
        LogLevel::Critical => Level::Critical,
        LogLevel::Error => Level::Error,
        LogLevel::Warn => Level::Warn,
        LogLevel::Info => Level::Info,
        LogLevel::Debug => Level::Debug,
        LogLevel::Trace => Level::Trace,
    })
}

/// The configured level, or `Info`. `verbose` raises it to at least `Debug`.
pub fn effective_level(config: &Config, verbose: bool) -> LogLevel {
    let level = config.log.as_ref().map(|log| log.level).unwrap_or(LogLevel::Info);
    if verbose {
        level.max(LogLevel::Debug)
    } else {
        level
    }
}

/// Progress on stdout, problems on stderr, so a batch run can be piped.
fn add_console_sinks(builder: &mut LoggerBuilder) -> spdlog::Result<()> {
    let stdout = Arc::new(StdStreamSink::builder()
        .std_stream(StdStream::Stdout)
        .level_filter(LevelFilter::MoreVerbose(Level::Warn))
        .build()?);

    let stderr = Arc::new(StdStreamSink::builder()
        .std_stream(StdStream::Stderr)
        .level_filter(LevelFilter::MoreSevereEqual(Level::Warn))
        .build()?);

    builder.sink(stdout).sink(stderr);

    Ok(())
}

fn add_run_log_sink(builder: &mut LoggerBuilder, location: &Path) -> spdlog::Result<()> {
    let daily_sink = Arc::new(RotatingFileSink::builder()
        .base_path(location)
        .rotation_policy(RotationPolicy::Daily { hour: 0, minute: 0 })
        .max_files(60)
        .rotate_on_open(false)
        .build()?);
    builder.sink(daily_sink);
    Ok(())
}

/// Builds the `draftmill` logger. With a log location every run is appended
/// to a daily file; the console is added when there is no file, when
/// `log_to_console` is set, or when running verbose.
pub fn build_logger(config: &Config, verbose: bool) -> spdlog::Result<Arc<Logger>> {
    let mut builder = Logger::builder();
    builder.name("draftmill");

    let location = config.log.as_ref().and_then(|log| log.location.as_deref());
    let log_to_console = config.log.as_ref().map(|log| log.log_to_console).unwrap_or(false);

    if let Some(location) = location {
        add_run_log_sink(&mut builder, location)?;
    }
    if location.is_none() || log_to_console || verbose {
        add_console_sinks(&mut builder)?;
    }

    let logger = Arc::new(builder.build()?);
    logger.set_flush_level_filter(LevelFilter::MoreSevereEqual(Level::Info));
    logger.set_flush_period(Some(Duration::from_secs(2)));
    logger.set_level_filter(level_filter(effective_level(config, verbose)));
    Ok(logger)
}

pub fn configure_logger(config: &Config, verbose: bool) -> spdlog::Result<()> {
    spdlog::set_default_logger(build_logger(config, verbose)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::Log;

    fn config_with_log(level: LogLevel, location: Option<&Path>, log_to_console: bool) -> Config {
        Config {
            log: Some(Log {
                level,
                log_to_console,
                location: location.map(Path::to_path_buf),
            }),
            ..Config::default()
        }
    }

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(&Config::default(), false), LogLevel::Info);
        assert_eq!(effective_level(&Config::default(), true), LogLevel::Debug);

        let warn_only = config_with_log(LogLevel::Warn, None, false);
        assert_eq!(effective_level(&warn_only, false), LogLevel::Warn);
        assert_eq!(effective_level(&warn_only, true), LogLevel::Debug);

        // Verbose never makes a trace config quieter
        let trace = config_with_log(LogLevel::Trace, None, false);
        assert_eq!(effective_level(&trace, true), LogLevel::Trace);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(LogLevel::Warn), LevelFilter::MoreSevereEqual(Level::Warn));
        assert_eq!(level_filter(LogLevel::Trace), LevelFilter::MoreSevereEqual(Level::Trace));
    }

    #[test]
    fn test_console_only_without_location() {
        let logger = build_logger(&Config::default(), false).unwrap();
        assert_eq!(logger.name(), Some("draftmill"));
        assert_eq!(logger.sinks().len(), 2);
        assert_eq!(logger.level_filter(), LevelFilter::MoreSevereEqual(Level::Info));
    }

    #[test]
    fn test_run_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_log(LogLevel::Debug, Some(&dir.path().join("draftmill.log")), false);

        let logger = build_logger(&config, false).unwrap();
        assert_eq!(logger.sinks().len(), 1);

        spdlog::info!(logger: logger, "2 draft(s) processed, 0 failed");
        logger.flush();

        let files: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("draftmill"));
        let text = fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert!(text.contains("2 draft(s) processed, 0 failed"));
    }

    #[test]
    fn test_verbose_adds_console() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_log(LogLevel::Info, Some(&dir.path().join("draftmill.log")), false);
        let logger = build_logger(&config, true).unwrap();
        assert_eq!(logger.sinks().len(), 3);
        assert_eq!(logger.level_filter(), LevelFilter::MoreSevereEqual(Level::Debug));
    }
}
