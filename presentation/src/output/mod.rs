//! Output formatting

pub mod console;
pub mod formatter;
pub mod json;

use toolgate_domain::OutputFormat;

use self::console::ConsoleFormatter;
use self::formatter::OutputFormatter;
use self::json::JsonFormatter;

/// Formatter for the selected output format.
pub fn formatter_for(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(ConsoleFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}
