use confluence::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Console (plain or JSON) plus an optional daily rolling file.
///
/// `RUST_LOG` wins over `logging.level`.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.level)));

    let console_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        Box::new(tracing_subscriber::fmt::layer().json().with_target(true))
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
    };

    // `rolling::daily` panics if it cannot create the first file
    let file_layer = config.dir.as_ref().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            return None;
        }
        let marker = dir.join(".confluence_write_test");
        if let Err(e) = std::fs::OpenOptions::new().create(true).append(true).open(&marker) {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            return None;
        }
        let _ = std::fs::remove_file(&marker);

        let file_appender = tracing_appender::rolling::daily(dir, "confluence.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The process logs until exit
        Box::leak(Box::new(guard));

        eprintln!("Logging to: {}/confluence.log", dir.display());
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(filter)
        .init();
}

/// `logging.level` as an `EnvFilter` directive, taken as written; blank means info
fn filter_directive(level: &str) -> String {
    match level.trim() {
        "" => "info".to_string(),
        level => level.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_as_written() {
        assert_eq!(filter_directive("info"), "info");
        assert_eq!(filter_directive(" INFO "), "INFO");
        assert_eq!(filter_directive("warn,confluence=debug"), "warn,confluence=debug");
        assert_eq!(filter_directive("  "), "info");
    }
}
