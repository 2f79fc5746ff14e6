use log::LevelFilter;

use crate::types::config::{colors_enabled, config};

fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Initialize the fern dispatcher from the effective config. Called once,
/// after config init so level and color are already resolved.
pub fn init_logging() {
    let level = level_filter(config().log().level());
    let color = colors_enabled();

    let dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            let tag = if color {
                let styled = match record.level() {
                    log::Level::Error => console::style("error").red().bold(),
                    log::Level::Warn => console::style("warn").yellow().bold(),
                    log::Level::Info => console::style("info").green(),
                    log::Level::Debug => console::style("debug").blue(),
                    log::Level::Trace => console::style("trace").dim(),
                };
                styled.to_string()
            } else {
                record.level().to_string().to_lowercase()
            };
            out.finish(format_args!("{tag}: {message}"))
        })
        .level(level)
        .chain(std::io::stderr());

    // A second init (tests, embedding) is harmless; keep the first logger
    let _ = dispatch.apply();
}
