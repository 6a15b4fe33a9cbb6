//! Output formatting for the CLI
//!
//! Colored progress lines and summary printing. Per-resource progress lines
//! carry a leading glyph (`+` create, `~` update, `-` delete) the formatter
//! colors; lifecycle status messages and the final JSON summary always print
//! to stdout.

use colored::Colorize;
use indexmap::IndexMap;
use serde_json::Value;

/// Output formatter for the lifecycle commands
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            verbosity,
        }
    }

    /// Print a lifecycle status message (always shown)
    pub fn status(&self, message: &str) {
        println!("{}", message);
    }

    /// Print a per-resource progress line, colored by its operation glyph
    pub fn progress(&self, line: &str) {
        if !self.use_color {
            println!("{}", line);
            return;
        }

        let colored_line = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else {
            line.dimmed().to_string()
        };
        println!("{}", colored_line);
    }

    /// Print a summary block (plain text, always shown)
    pub fn summary(&self, message: &str) {
        println!("{}", message);
    }

    /// Print exported stack outputs
    pub fn outputs(&self, outputs: &IndexMap<String, Value>) {
        if outputs.is_empty() {
            return;
        }

        if self.use_color {
            println!("\n{}:", "Outputs".bright_white().bold());
        } else {
            println!("\nOutputs:");
        }
        for (key, value) in outputs {
            let rendered = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
            if self.use_color {
                println!("  {} {} = {}", "-".bright_black(), key, rendered);
            } else {
                println!("  - {} = {}", key, rendered);
            }
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_formatter_construction() {
        let formatter = OutputFormatter::new(false, 0);
        assert!(!formatter.use_color);

        // Smoke-test the printing paths
        formatter.status("updating stack...");
        formatter.progress("+  azure:network:PublicIpAddress dev01: creating");
        formatter.progress("   azure:resources:ResourceGroup dev: unchanged");
        formatter.summary("update summary: {}");

        let mut outputs = IndexMap::new();
        outputs.insert("automation_account".to_string(), json!("aa-dev-mgmt"));
        formatter.outputs(&outputs);
    }
}
