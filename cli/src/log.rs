use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Prints a bold, prominent title for major sections of output.
pub fn print_title(text: &str) {
    println!("{}", format!("\n{}", text).bold());
}

/// Prints a plain informational message.
pub fn print_info(text: &str) {
    println!("{}", text);
}

pub fn print_divider() {
    println!();
}

/// Prints a highlighted section header with yellow bold text and surrounding markers.
pub fn print_section_header(text: &str) {
    println!("{}", format!("\n=== {} ===", text).yellow().bold());
}

pub fn print_message(text: &str) {
    println!("{}", format!("→ {}", text).cyan());
}

pub fn print_count(text: &str) {
    println!("{}", format!("⟐ {}", text).blue());
}

pub fn print_success(text: &str) {
    println!("{}", format!("✓ {}", text).green());
}

pub fn print_warning(text: &str) {
    println!("{}", format!("! {}", text).yellow());
}

/// Prints an error message with a red cross prefix to indicate failure.
pub fn print_error(text: &str) {
    println!("{}", format!("✗ {}", text).red());
}

/// Spinner that ticks on its own until finished.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {wide_msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
