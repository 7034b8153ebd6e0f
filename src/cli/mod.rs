//! tabtrain CLI Module
//!
//! Command-line interface for training the roster, inspecting the stored
//! feature schema, predicting single records and running the web server.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::data::TableLoader;
use crate::inference::InferenceEngine;
use crate::preprocessing::{record_from_json, FieldValue, Record};
use crate::registry::{FsModelRegistry, ModelRegistry};
use crate::server::parse_delimiter;
use crate::training::{ModelKind, TrainEngine, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabtrain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a roster of classifiers on a delimited table and serve predictions")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train every model in the roster on a table
    Train {
        /// Delimited input file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Model registry directory
        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        models_dir: PathBuf,

        /// Field delimiter (single character or "tab")
        #[arg(long, default_value = ";")]
        delimiter: String,
    },

    /// Print the feature names of the last training run
    Features {
        /// Model registry directory
        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        models_dir: PathBuf,
    },

    /// Classify one record with a trained model
    Predict {
        /// Model registry directory
        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        models_dir: PathBuf,

        /// Roster member to use (random_forest, gradient_boosting, svm)
        #[arg(short, long)]
        model: Option<String>,

        /// Field value as name=value; repeatable
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// JSON file holding one record object
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show the columns of a table without training
    Columns {
        /// Delimited input file
        #[arg(short, long)]
        data: PathBuf,

        /// Field delimiter (single character or "tab")
        #[arg(long, default_value = ";")]
        delimiter: String,
    },

    /// Start the web server
    Serve {
        /// Server port
        #[arg(short, long, env = "PORT", default_value = "5000")]
        port: u16,

        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Model registry directory
        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        models_dir: PathBuf,
    },
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn loader_for(delimiter: &str) -> anyhow::Result<TableLoader> {
    let byte = parse_delimiter(delimiter)
        .with_context(|| format!("Invalid delimiter: {:?}", delimiter))?;
    Ok(TableLoader::new().with_delimiter(byte))
}

fn open_registry(models_dir: &Path) -> anyhow::Result<Arc<dyn ModelRegistry>> {
    let registry = FsModelRegistry::open(models_dir)
        .with_context(|| format!("Could not open model registry at {}", models_dir.display()))?;
    Ok(Arc::new(registry))
}

/// Build a record from `name=value` pairs, optionally layered over a JSON file
pub fn parse_record(fields: &[String], input: Option<&Path>) -> anyhow::Result<Record> {
    let mut record = Record::new();

    if let Some(path) = input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        match serde_json::from_str::<serde_json::Value>(&text)? {
            serde_json::Value::Object(map) => record.extend(record_from_json(map)),
            _ => anyhow::bail!("{} must contain a JSON object", path.display()),
        }
    }

    for field in fields {
        let (name, value) = field
            .split_once('=')
            .with_context(|| format!("Expected name=value, got {:?}", field))?;
        record.insert(name.trim().to_string(), FieldValue::from(value));
    }

    Ok(record)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    target: &str,
    models_dir: &Path,
    delimiter: &str,
) -> anyhow::Result<()> {
    section("Train");

    let loader = loader_for(delimiter)?;
    step_run("Loading data");
    let start = Instant::now();
    let table = loader.load_path(data_path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        table.n_rows(),
        table.n_columns(),
        start.elapsed()
    ));

    let engine = TrainEngine::new(TrainingConfig::default(), open_registry(models_dir)?);

    step_run(&format!("Training roster on {}", target.cyan()));
    let start = Instant::now();
    let result = engine.train_table(&table, target)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {:<20} {}", muted("Features"), result.feature_names.len().to_string().white());
    println!(
        "  {:<20} {}",
        muted("Rows"),
        format!("{} train / {} held out", result.n_train, result.n_held_out).white()
    );
    for kind in ModelKind::ROSTER {
        println!("  {:<20} {}", muted(kind.name()), ok("fitted"));
    }
    println!();
    step_ok(&format!("Saved to {}", models_dir.display()));
    println!();

    Ok(())
}

pub fn cmd_features(models_dir: &Path) -> anyhow::Result<()> {
    section("Features");

    let engine = InferenceEngine::new(open_registry(models_dir)?);
    let schema = engine.schema()?;

    println!("  {}", kv("Target ", schema.target()));
    println!();
    for (i, name) in schema.names().iter().enumerate() {
        println!("  {:>4}  {}", dim(&i.to_string()), name);
    }
    println!();

    Ok(())
}

pub fn cmd_predict(
    models_dir: &Path,
    model: Option<&str>,
    fields: &[String],
    input: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    let kind = match model {
        Some(name) => name.parse::<ModelKind>()?,
        None => ModelKind::DEFAULT,
    };
    let record = parse_record(fields, input)?;

    let engine = InferenceEngine::new(open_registry(models_dir)?);
    let label = engine.predict_with(kind, &record)?;

    println!("  {}", kv("Model      ", kind.name()));
    println!("  {}", kv("Prediction ", &label.to_string()));
    println!();

    Ok(())
}

pub fn cmd_columns(data_path: &Path, delimiter: &str) -> anyhow::Result<()> {
    section("Columns");

    let table = loader_for(delimiter)?.load_path(data_path)?;
    println!("  {}", kv("Rows    ", &table.n_rows().to_string()));
    println!("  {}", kv("Columns ", &table.n_columns().to_string()));
    println!();

    let frame = table.frame();
    for name in table.column_names() {
        let dtype = frame
            .column(&name)
            .map(|c| c.dtype().to_string())
            .unwrap_or_default();
        println!("  {:<28} {}", name, dim(&dtype));
    }
    println!();

    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16, models_dir: &Path) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "tabtrain".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Web UI ", &format!("http://{}:{}", host, port)));
    line_box(&kv("API    ", &format!("http://{}:{}/api", host, port)));
    line_box(&kv("Models ", &models_dir.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        models_dir: models_dir.display().to_string(),
        ..Default::default()
    };

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_record_fields() {
        let record = parse_record(&["age=41".to_string(), "job=admin.".to_string()], None).unwrap();
        assert_eq!(record.get("age"), Some(&FieldValue::Text("41".to_string())));
        assert_eq!(record.get("job"), Some(&FieldValue::Text("admin.".to_string())));
    }

    #[test]
    fn test_parse_record_rejects_bare_value() {
        assert!(parse_record(&["age".to_string()], None).is_err());
    }

    #[test]
    fn test_parse_record_fields_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"age": 30, "job": "technician"}}"#).unwrap();

        let record = parse_record(&["age=55".to_string()], Some(file.path())).unwrap();
        assert_eq!(record.get("age"), Some(&FieldValue::Text("55".to_string())));
        assert_eq!(record.get("job"), Some(&FieldValue::Text("technician".to_string())));
    }

    #[test]
    fn test_parse_record_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(parse_record(&[], Some(file.path())).is_err());
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", ok("done"));
        assert_eq!(strip_ansi(&colored), "done");
    }
}
