//! Terminal and JSON output for the CLI.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Column widths of the warm report table.
const ROUTE_COLUMNS: [usize; 3] = [28, 10, 9];

/// Output handler for CLI messages.
///
/// In JSON mode only [`json`](Self::json) and [`error`](Self::error) write
/// anything, so stdout carries a single document.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Plain progress note.
    pub fn note(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("ℹ").blue(), msg);
        }
    }

    pub fn done(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("✓").green(), msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.json {
            eprintln!("{} {}", style("⚠").yellow(), msg);
        }
    }

    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("{} {}", style("→").dim(), style(msg).dim());
        }
    }

    pub fn section(&self, title: &str) {
        if !self.json {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn field(&self, key: &str, value: &str) {
        if !self.json {
            println!("  {}: {}", style(key).dim(), value);
        }
    }

    /// One shared-data prop of a route: `prop -> hash (state)`.
    pub fn prop(&self, prop: &str, hash: &str, state: Option<&str>) {
        if self.json {
            return;
        }
        match state {
            Some(state) => println!("  {} {} -> {} ({})", style("•").dim(), prop, hash, state),
            None => println!("  {} {} -> {}", style("•").dim(), prop, hash),
        }
    }

    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    pub fn route_table_header(&self) {
        self.route_row("ROUTE", "STATUS", "HYDRATED");
    }

    /// One row of the warm report. `status` may carry color codes.
    pub fn route_row(&self, route: &str, status: &str, hydrated: &str) {
        if self.json {
            return;
        }
        let [route_w, status_w, hydrated_w] = ROUTE_COLUMNS;
        println!(
            "  {:route_w$}  {:status_w$}  {:hydrated_w$}",
            route, status, hydrated
        );
    }

    /// Progress bar for prefetching `total` routes; hidden in JSON mode.
    pub fn warm_progress(&self, total: u64) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message("prefetching");
        pb
    }
}

/// Colored label for a route's cache state or lookup outcome.
pub fn status_badge(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "hit" | "fetched" => style(status).green().to_string(),
        "inflight" | "fallback" => style(status).yellow().to_string(),
        "errored" => style(status).red().to_string(),
        "miss" | "skipped" => style(status).dim().to_string(),
        _ => status.to_string(),
    }
}
