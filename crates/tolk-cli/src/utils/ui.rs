// CLI output formatting with consistent styling using indicatif and colored.
// Progress text goes to stdout with println!, diagnostics through tracing on stderr.

use crate::gettext::Invocation;
use colored::Colorize as _;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PD_TICK: Duration = Duration::from_millis(100);

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TOLK_LOG";

static E2E_MODE: AtomicBool = AtomicBool::new(false);

/// Enable E2E mode for deterministic output (no colors, fixed durations, hidden progress bars).
pub fn set_e2e_mode(enabled: bool) {
    E2E_MODE.store(enabled, Ordering::SeqCst);
    if enabled {
        colored::control::set_override(false);
    }
}

pub fn is_e2e() -> bool {
    E2E_MODE.load(Ordering::SeqCst)
}

fn format_duration(duration: Duration) -> String {
    if is_e2e() {
        "[DURATION]".to_string()
    } else {
        humantime::format_duration(duration).to_string()
    }
}

fn display_path(path: &Path) -> String {
    use path_slash::PathExt as _;
    path.to_slash_lossy().into_owned()
}

/// Install the global tracing subscriber, writing to stderr.
///
/// The filter comes from `TOLK_LOG` when set, otherwise `warn` (`debug` with
/// `verbose`).
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(!is_e2e())
        .try_init()
        .ok();
}

pub fn create_spinner(msg: &str) -> ProgressBar {
    if is_e2e() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(PD_TICK);
    pb
}

pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    if is_e2e() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(PD_TICK);
    pb
}

// Extract

pub fn print_extract_header() {
    println!("{}", "Gettext Template Extractor".dimmed());
}

pub fn print_no_domains() {
    eprintln!("{}", "No domains configured in tolk.toml.".red());
}

pub fn print_creating_dir(path: &Path) {
    println!("{} {}", "Creating".dimmed(), display_path(path).green());
}

pub fn print_extracting(domain: &str) {
    println!("{} {}", "Extracting domain".dimmed(), domain.green());
}

pub fn print_extracted(domain: &str, path: &Path, message_count: usize, duration: Duration) {
    println!(
        "{} {} ({} messages) -> {}",
        format!("{} extracted in", domain).dimmed(),
        format_duration(duration).green(),
        message_count.to_string().cyan(),
        display_path(path)
    );
}

pub fn print_concatenated(path: &Path, domains: &[String]) {
    println!(
        "{} {} {} {}",
        "Combined".dimmed(),
        domains.join(", ").cyan(),
        "into".dimmed(),
        display_path(path).green()
    );
}

// Merge

pub fn print_merge_header() {
    println!("{}", "Gettext Catalog Merger".dimmed());
}

pub fn print_no_locales(locale_dir: &Path) {
    eprintln!(
        "{} {}",
        "No locales found in".yellow(),
        display_path(locale_dir).white().bold()
    );
}

pub fn print_merging(domain: &str, locale_count: usize) {
    println!(
        "{} {} {}",
        "Merging domain".dimmed(),
        domain.green(),
        format!("({} locale(s))", locale_count).dimmed()
    );
}

pub fn print_initializing(path: &Path) {
    println!("  {} {}", "Initializing".dimmed(), display_path(path).cyan());
}

pub fn print_command(invocation: &Invocation) {
    println!("  {} {}", "Would run".yellow(), invocation);
}

pub fn print_domain_failed(domain: &str, locale: &str) {
    eprintln!(
        "{} {} ({})",
        "Merge failed for".red(),
        domain.white().bold(),
        locale
    );
}

pub fn print_merged(initialized: usize, merged: usize, duration: Duration) {
    println!(
        "{} {} ({} merged, {} initialized)",
        "Merged in".dimmed(),
        format_duration(duration).green(),
        merged.to_string().cyan(),
        initialized.to_string().cyan()
    );
}

pub fn print_dry_run_done() {
    println!("{}", "Dry run: no files were changed.".yellow());
}
