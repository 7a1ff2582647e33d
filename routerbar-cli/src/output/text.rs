//! Text output formatting with colors.

use routerbar_core::{RuntimeState, StateMode, Usage, activity_url, format_usd, tooltip};
use routerbar_store::Config;
use std::path::Path;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the spend summary followed by the activity link.
    ///
    /// The summary lines are the same ones the background monitor logs; only
    /// the stale-error line and the not-configured hint are colored.
    pub fn format_summary(&self, state: &RuntimeState, token_configured: bool) -> String {
        let summary = tooltip(state, token_configured);
        if !token_configured || state.mode() == StateMode::NotConfigured {
            return self.yellow(&summary);
        }

        let mut lines: Vec<String> = summary
            .lines()
            .map(|line| {
                if line.starts_with("ERROR:") {
                    self.red(line)
                } else if let Some(rest) = line.strip_prefix("Total:") {
                    format!("{}{}", self.bold("Total:"), rest)
                } else {
                    line.to_string()
                }
            })
            .collect();
        lines.push(self.dim(&activity_url(state.usage.key_id.as_deref())));
        lines.join("\n")
    }

    /// Formats the outcome of a credential check.
    pub fn format_check(&self, result: &Result<Usage, String>) -> String {
        match result {
            Ok(usage) => {
                let mut line = format!("{} Token valid, total {}", self.green("✓"), format_usd(usage.total));
                if let Some(label) = usage.label.as_deref().filter(|l| !l.is_empty()) {
                    line.push_str(&format!(" ({label})"));
                }
                line
            }
            Err(e) => format!("{} {}", self.red("✗"), e),
        }
    }

    /// Formats the configuration with the credential redacted.
    pub fn format_config(&self, config: &Config, path: &Path) -> String {
        let token = if config.has_token() {
            config.connection.redacted_token()
        } else {
            self.yellow("(not set)")
        };
        let n = &config.notifications;

        let mut lines = vec![
            self.bold("RouterBar Configuration"),
            "─".repeat(40),
            format!("File: {}", self.dim(&path.display().to_string())),
            String::new(),
            format!("Token:            {token}"),
            format!("Period:           {}", config.updates.period),
            format!("Update on start:  {}", on_off(config.updates.update_on_start)),
            String::new(),
            format!("Notifications:    {}", on_off(n.enabled)),
        ];
        if n.enabled {
            lines.push(format!("  on spend:       {}", on_off(n.on_update_spent)));
            lines.push(format!("  on error:       {}", on_off(n.on_error)));
            lines.push(format!("  start summary:  {}", on_off(n.on_start_summary)));
        }
        lines.push(String::new());
        lines.push(format!("Log level:        {}", config.logging.level));
        lines.push(format!("Log to file:      {}", on_off(config.logging.to_file)));
        lines.join("\n")
    }

    /// Formats the file locations.
    pub fn format_paths(&self, config: &Path, cache: &Path, log: &Path) -> String {
        [
            format!("{} {}", self.bold("Config:"), config.display()),
            format!("{} {}", self.bold("Cache: "), cache.display()),
            format!("{} {}", self.bold("Log:   "), log.display()),
        ]
        .join("\n")
    }

    // ========================================================================
    // Color helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
