//! Output formatting utilities

use classifier_lib::Diagnosis;
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability as percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Format a class count pair as "malignant / benign"
pub fn format_class_counts(counts: [usize; 2]) -> String {
    format!("{} / {}", counts[0], counts[1])
}

/// Color a diagnosis: malignant red, benign green
pub fn color_diagnosis(diagnosis: Diagnosis) -> String {
    match diagnosis {
        Diagnosis::Malignant => diagnosis.display_name().red().bold().to_string(),
        Diagnosis::Benign => diagnosis.display_name().green().bold().to_string(),
    }
}

/// Whether a reported status means the service is up
pub fn is_healthy(status: &str) -> bool {
    matches!(status.to_lowercase().as_str(), "ok" | "healthy")
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    if is_healthy(status) {
        return status.green().to_string();
    }
    match status.to_lowercase().as_str() {
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color accuracy based on value
pub fn color_accuracy(accuracy: f64) -> String {
    let formatted = format_probability(accuracy);
    if accuracy >= 0.9 {
        formatted.green().to_string()
    } else if accuracy >= 0.8 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
