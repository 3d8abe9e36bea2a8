//! Colored console output for discovery runs.

use crate::surface::Surface;
use crate::types::{PartialRun, ProbeResult, RunReport, Stage};
use colored::Colorize;

/// Console output handler with colors and formatting.
///
/// Everything is suppressed in JSON mode so stdout stays machine readable.
#[derive(Debug, Clone)]
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
}

impl ConsoleOutput {
    pub fn new(verbose: bool, json_mode: bool) -> Self {
        Self { verbose, json_mode }
    }

    pub fn print_banner(&self) {
        if self.json_mode {
            return;
        }

        println!();
        println!("{}", "╔══════════════════════════════════════════════════════════════╗".cyan());
        println!("{}", "║                    SURFMAP v0.1.0                            ║".cyan());
        println!("{}", "║           Attack Surface Discovery Pipeline                  ║".cyan());
        println!("{}", "╚══════════════════════════════════════════════════════════════╝".cyan());
        println!();
    }

    /// Print info message.
    pub fn print_info(&self, message: &str) {
        if self.json_mode {
            return;
        }

        println!("{} {}", "[*]".bright_blue(), message);
    }

    /// Print a warning.
    pub fn print_warning(&self, message: &str) {
        if self.json_mode {
            return;
        }

        println!("{} {}", "[!]".yellow().bold(), message.yellow());
    }

    /// Print the surface size after a stage.
    pub fn print_stage(&self, stage: Stage, surface: &Surface) {
        if self.json_mode {
            return;
        }

        println!(
            "{} {:<24} {}",
            "[+]".green(),
            stage.to_string().bright_white(),
            surface.summary().dimmed()
        );
    }

    pub fn print_wildcards(&self, wildcards: &[String]) {
        if self.json_mode {
            return;
        }

        if wildcards.is_empty() {
            println!("{} {}", "[+]".green(), "No wildcard DNS roots".dimmed());
            return;
        }

        println!(
            "{} {} wildcard DNS roots (excluded from fuzzing):",
            "[!]".yellow().bold(),
            wildcards.len()
        );
        for root in wildcards {
            println!("    *.{}", root.yellow());
        }
    }

    /// Print probe results; failures only in verbose mode.
    pub fn print_probe_results(&self, probes: &[ProbeResult]) {
        if self.json_mode {
            return;
        }

        println!();
        println!("{}", "=== Active Probing ===".bright_cyan());
        for probe in probes {
            match (probe.status_code, &probe.error) {
                (Some(code), _) => println!(
                    "  {} {}",
                    format_status(code),
                    probe.url.as_deref().unwrap_or(&probe.target).bright_white()
                ),
                (None, Some(error)) if self.verbose => {
                    println!("  {} {} {}", "---".dimmed(), probe.target, error.dimmed())
                }
                _ => {}
            }
        }
    }

    /// Print the final run summary.
    pub fn print_summary(&self, report: &RunReport) {
        if self.json_mode {
            return;
        }

        let answered = report.probes.iter().filter(|p| p.status_code.is_some()).count();

        println!();
        println!("{}", "=== Discovery Summary ===".bright_cyan());
        println!("  Duration:   {:.2}s", report.duration_secs);
        println!("  Surface:    {}", report.surface.summary());
        println!("  Wildcards:  {}", report.wildcards.len());
        println!("  DNS cache:  {} names", report.dns_cache_entries);
        if !report.probes.is_empty() {
            println!("  Responding: {}/{}", answered, report.probes.len());
        }
        println!();
    }

    /// Report a run that stopped early, including the surface kept so far.
    pub fn print_partial(&self, partial: &PartialRun) {
        if self.json_mode {
            return;
        }

        println!();
        println!(
            "{} {}",
            "Run halted:".red().bold(),
            partial.error.to_string().red()
        );
        println!("  Stage:      {}", partial.stage);
        println!("  Surface:    {}", partial.surface.summary());
        println!();
    }
}

fn format_status(code: u16) -> colored::ColoredString {
    let text = code.to_string();
    match code {
        200..=299 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.yellow(),
        _ => text.red(),
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false)
    }
}
