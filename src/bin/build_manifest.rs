//! Manifest builder for LiverAid model directories.
//!
//! Writes `manifest.json` binding every known artifact present in the
//! directory to its SHA-256 digest. Once a manifest exists, the predictors
//! refuse artifacts that are unlisted or whose digest differs.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin build_manifest -- <model_dir>
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use liveraid::adapters::artifact::sha256_hex;
use liveraid::adapters::predictors::ARTIFACT_FILES;

#[derive(Debug, Serialize)]
struct Manifest {
    version: u32,
    files: BTreeMap<String, String>,
}

fn parse_args() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(dir), None) if dir != "-h" && dir != "--help" => Ok(PathBuf::from(dir)),
        _ => bail!("Usage: build_manifest <model_dir>"),
    }
}

fn main() -> Result<()> {
    let model_dir = parse_args()?;
    if !model_dir.is_dir() {
        bail!("{} is not a directory", model_dir.display());
    }

    let mut files = BTreeMap::new();
    for rel in ARTIFACT_FILES {
        let path = model_dir.join(rel);
        if path.is_file() {
            let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            files.insert(rel.to_string(), sha256_hex(&bytes));
        }
    }

    if files.is_empty() {
        bail!("No known artifacts found in {}", model_dir.display());
    }

    let count = files.len();
    let manifest = Manifest { version: 1, files };
    let out = model_dir.join("manifest.json");
    fs::write(&out, serde_json::to_vec_pretty(&manifest)?)
        .with_context(|| format!("writing {}", out.display()))?;

    println!("Wrote {} ({count} files)", out.display());
    Ok(())
}
