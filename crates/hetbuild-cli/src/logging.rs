use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

/// Target prefix shared by the engine library and this binary.
const HETBUILD_TARGET: &str = "hetbuild";

/// How much is logged, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// `-q` keeps errors only, otherwise each `-v` lowers the threshold by one level.
    pub fn from_flags(verbosity: u8, quiet: bool, file: Option<PathBuf>) -> Self {
        let level = if quiet {
            LevelFilter::ERROR
        } else {
            match verbosity {
                0 => LevelFilter::WARN,
                1 => LevelFilter::INFO,
                2 => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            }
        };
        Self { level, file }
    }

    /// Search records at `level`; third-party crates such as rayon never below warnings.
    fn targets(level: LevelFilter) -> Targets {
        Targets::new()
            .with_default(level.min(LevelFilter::WARN))
            .with_target(HETBUILD_TARGET, level)
    }

    /// A log file always keeps at least the search parameters and summaries.
    fn file_level(&self) -> LevelFilter {
        self.level.max(LevelFilter::INFO)
    }
}

/// Installs the global subscriber: a compact stderr layer and, with `--log-file`, a
/// plain-text layer with thread ids for matcher runs spread over the rayon pool.
pub fn setup_logging(settings: &LogSettings) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(LogSettings::targets(settings.level));

    let file_layer = match &settings.file {
        Some(path) => {
            let file = File::create(path).map_err(CliError::Io)?;
            let layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(true)
                .with_filter(LogSettings::targets(settings.file_level()));
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, error, info, trace, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            let settings = LogSettings::from_flags(3, false, None);
            setup_logging(&settings).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    fn flags_map_to_levels() {
        let level = |v, q| LogSettings::from_flags(v, q, None).level;
        assert_eq!(level(0, false), LevelFilter::WARN);
        assert_eq!(level(1, false), LevelFilter::INFO);
        assert_eq!(level(2, false), LevelFilter::DEBUG);
        assert_eq!(level(7, false), LevelFilter::TRACE);
        assert_eq!(level(3, true), LevelFilter::ERROR);
    }

    #[test]
    fn log_file_keeps_search_summaries_when_quiet() {
        let quiet = LogSettings::from_flags(0, true, Some(PathBuf::from("search.log")));
        assert_eq!(quiet.file_level(), LevelFilter::INFO);
        let verbose = LogSettings::from_flags(3, false, None);
        assert_eq!(verbose.file_level(), LevelFilter::TRACE);
    }

    #[test]
    #[serial]
    fn initialization_and_macros_work() {
        ensure_global_logger_is_set();

        error!(layer = "lower", "Symmetry service failed");
        warn!("Falling back to identity equivalence");
        info!(n_max = 10, "Starting coincidence lattice search.");
        debug!("Resolved lattice point groups.");
        trace!("Accepted candidate.");
    }

    #[test]
    #[serial]
    fn verbose_filter_drops_third_party_debug_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("search.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_filter(LogSettings::targets(LevelFilter::DEBUG));
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!(target: "hetbuild::engine::matcher", candidates = 42, "Merged matcher results.");
            debug!(target: "rayon_core::registry", "worker thread started");
            warn!(target: "rayon_core::registry", "worker thread panicked");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("candidates=42"));
        assert!(content.contains("ThreadId"));
        assert!(!content.contains("worker thread started"));
        assert!(content.contains("worker thread panicked"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let settings = LogSettings::from_flags(0, false, Some(invalid_path));
            assert!(matches!(setup_logging(&settings), Err(CliError::Io(_))));
        }
    }
}
