//! Offline commands working directly on the artifact bundle

use anyhow::{Context, Result};
use classifier_lib::{
    resolve_model_dir, ArtifactStore, BundleManifest, FeatureSchema, TrainingConfig,
    TrainingPipeline, TrainingReport,
};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{
    color_accuracy, format_class_counts, print_json, print_success, print_table, OutputFormat,
};

/// Row for the feature schema table
#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Form field")]
    field: String,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Serialize)]
struct TrainSummary<'a> {
    model_dir: String,
    report: &'a TrainingReport,
    manifest: &'a BundleManifest,
}

/// Hyperparameter overrides accepted by `bcp train`
#[derive(Debug, Clone, Copy)]
pub struct TrainArgs {
    pub seed: u64,
    pub test_size: f64,
    pub c: f64,
}

impl TrainArgs {
    fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            seed: self.seed,
            test_fraction: self.test_size,
            c: self.c,
            ..TrainingConfig::default()
        }
    }
}

/// Train on the embedded dataset and write the bundle
pub fn train(model_dir: Option<PathBuf>, args: TrainArgs, format: OutputFormat) -> Result<()> {
    let dir = resolve_model_dir(model_dir.as_deref());
    let store = ArtifactStore::new(&dir);
    let pipeline = TrainingPipeline::new(args.training_config());

    let (outcome, manifest) = pipeline
        .run(&store)
        .with_context(|| format!("Training failed for {}", dir.display()))?;
    let report = &outcome.report;

    match format {
        OutputFormat::Json => print_json(&TrainSummary {
            model_dir: dir.display().to_string(),
            report,
            manifest: &manifest,
        }),
        OutputFormat::Table => {
            println!("{}", "Training Report".bold());
            println!("{}", "=".repeat(50));
            println!("Seed:                   {}", report.seed);
            println!("Test accuracy:          {}", color_accuracy(report.test_accuracy));
            println!("Support vectors:        {}", report.support_vectors);
            println!("Gamma:                  {:.6}", report.gamma);
            println!(
                "Train samples:          {} ({} malignant / benign)",
                report.train_samples,
                format_class_counts(report.train_class_counts)
            );
            println!(
                "Test samples:           {} ({} malignant / benign)",
                report.test_samples,
                format_class_counts(report.test_class_counts)
            );
            println!("Duration:               {} ms", report.duration_ms);
            println!(
                "Created:                {}",
                manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!();
            print_success(&format!("Bundle written to {}", dir.display().to_string().cyan()));
        }
    }

    Ok(())
}

/// List the feature schema of an existing bundle
pub fn features(model_dir: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let dir = resolve_model_dir(model_dir.as_deref());
    let bundle = ArtifactStore::new(&dir)
        .load()
        .with_context(|| format!("Failed to load artifact bundle from {}", dir.display()))?;

    print_table(&feature_rows(&bundle.schema), format);
    Ok(())
}

fn feature_rows(schema: &FeatureSchema) -> Vec<FeatureRow> {
    schema
        .names()
        .iter()
        .enumerate()
        .map(|(index, name)| FeatureRow {
            index,
            field: FeatureSchema::form_field(index),
            name: name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_rows() {
        let schema = FeatureSchema::new(vec!["mean radius".into(), "mean texture".into()]);
        let rows = feature_rows(&schema);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, 1);
        assert_eq!(rows[1].field, "feature1");
        assert_eq!(rows[1].name, "mean texture");
    }

    #[test]
    fn test_train_args_override_defaults() {
        let config = TrainArgs {
            seed: 7,
            test_size: 0.3,
            c: 2.5,
        }
        .training_config();
        let defaults = TrainingConfig::default();
        assert_eq!(config.seed, 7);
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.c, 2.5);
        assert_eq!(config.tol, defaults.tol);
        assert_eq!(config.calibration_folds, defaults.calibration_folds);
    }
}
