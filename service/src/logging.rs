use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// Dependencies that are silenced below Trace level. The websocket stack in
/// particular logs every frame it reads or writes.
const FILTERED_MODULES: &[&str] = &[
    "tower",
    "tracing",
    "hyper",
    "axum",
    "tungstenite",
    "tokio_tungstenite",
];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at the level requested by `config`.
    ///
    /// Fails if a global logger has already been installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        simplelog::TermLogger::init(
            Self::simplelog_level(config.log_level_filter),
            Self::build_log_config(config.log_level_filter),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    fn simplelog_level(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    /// Only Trace shows dependency output.
    fn filtered_modules(level: LevelFilter) -> &'static [&'static str] {
        if level == LevelFilter::Trace {
            &[]
        } else {
            FILTERED_MODULES
        }
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in Self::filtered_modules(level) {
            builder.add_filter_ignore_str(*module);
        }

        builder.build()
    }
}
