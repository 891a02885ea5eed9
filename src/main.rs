//! LiverAid: liver-disease risk assessment.
//!
//! # Usage
//!
//! ```bash
//! liveraid [PATH | --sample low|moderate|high]
//! ```
//!
//! Reads one patient JSON object from PATH (stdin when absent) and prints
//! the assessment as pretty JSON on stdout. Logs go to stderr or to
//! `LIVERAID_LOG_FILE` when `LIVERAID_LOG_MODE=file`.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use liveraid::adapters::sanitize::SanitizingMakeWriter;
use liveraid::config::LogMode;
use liveraid::domain::SamplePatient;
use liveraid::{AssessmentService, Settings};

enum Input {
    Sample(SamplePatient),
    File(String),
    Stdin,
}

fn parse_args() -> Result<Input> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(Input::Stdin),
        [flag, level] if flag == "--sample" => Ok(Input::Sample(SamplePatient::from_str(level)?)),
        [path] if !path.starts_with("--") => Ok(Input::File(path.clone())),
        _ => bail!("usage: liveraid [PATH | --sample low|moderate|high]"),
    }
}

fn main() -> Result<()> {
    let settings = Settings::from_env();

    // Stdout carries the assessment; logs never go there.
    let (writer, _guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .with_context(|| format!("opening log file {}", settings.log_file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let input = parse_args()?;
    let service = AssessmentService::load(&settings)?;

    let result = match input {
        Input::Sample(sample) => {
            tracing::info!("Assessing sample patient: {}", sample.description());
            service.assess(&sample.record())
        }
        Input::File(path) => {
            let file = std::fs::File::open(&path).with_context(|| format!("opening {path}"))?;
            service
                .assess_reader(std::io::BufReader::new(file))
                .with_context(|| format!("assessing {path}"))?
        }
        Input::Stdin => service
            .assess_reader(std::io::stdin().lock())
            .context("assessing patient JSON from stdin")?,
    };

    println!("{}", serde_json::to_string_pretty(&result.to_json()?)?);
    Ok(())
}
