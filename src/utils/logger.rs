use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// Colours for the scan summary and check report.
pub struct Colors;

impl Colors {
    pub const NEW: &'static str = "green";
    pub const CHANGED: &'static str = "yellow";
    pub const MISSING: &'static str = "red";
    pub const FAULT: &'static str = "magenta";

    pub fn colorize(color: &str, text: &str) -> ColoredString {
        text.color(color)
    }
}

/// Install the env_logger backend. Our crate logs at Info (Debug when `verbose`); dependencies at Warn.
/// Safe to call more than once (later calls are ignored).
pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
