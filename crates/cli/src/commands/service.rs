//! Commands talking to a running prediction server

use anyhow::{Context, Result};
use classifier_lib::FeatureInput;
use colored::Colorize;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::client::ApiClient;
use crate::output::{
    color_diagnosis, color_status, format_probability, is_healthy, print_info, print_json,
    print_warning, OutputFormat,
};

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("Value {position} is not a number: {value:?}")]
    NotNumeric { position: usize, value: String },

    #[error("No feature values given")]
    Empty,
}

/// Parse a comma separated list of feature values
pub fn parse_values(raw: &str) -> Result<Vec<f64>, InputError> {
    if raw.trim().is_empty() {
        return Err(InputError::Empty);
    }

    raw.split(',')
        .enumerate()
        .map(|(position, value)| {
            let value = value.trim();
            value.parse::<f64>().map_err(|_| InputError::NotNumeric {
                position,
                value: value.to_string(),
            })
        })
        .collect()
}

/// File payloads: a bare list or name map, or a full request body
#[derive(Deserialize)]
#[serde(untagged)]
enum FilePayload {
    Request { features: FeatureInput },
    Features(FeatureInput),
}

/// Read feature values from a JSON file
pub fn read_features(path: &Path) -> Result<FeatureInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let payload: FilePayload = serde_json::from_str(&content)
        .with_context(|| format!("{} does not contain feature values", path.display()))?;

    Ok(match payload {
        FilePayload::Request { features } | FilePayload::Features(features) => features,
    })
}

/// Request a prediction from the server
pub async fn predict(client: &ApiClient, features: FeatureInput, format: OutputFormat) -> Result<()> {
    let result = client.predict(features).await?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => {
            println!("{}", "Prediction".bold());
            println!("{}", "=".repeat(40));
            println!("Diagnosis:          {}", color_diagnosis(result.diagnosis));
            println!("Label:              {}", result.prediction);
            println!(
                "Probability benign: {}",
                format_probability(result.probability_benign)
            );
        }
    }

    Ok(())
}

/// Check the server's health endpoint
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health),
        OutputFormat::Table => {
            println!("Status:  {}", color_status(&health.status));
            println!("Model:   {}", health.model);
            match &health.version {
                Some(version) => println!("Version: {}", version.cyan()),
                None => print_info("Server does not report a version"),
            }
            if !is_healthy(&health.status) {
                print_warning("Server is not reporting healthy");
            }
        }
    }

    Ok(())
}
