// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Schema inspection and storage.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use renderstream::{ManagedSchema, RenderStreamApi, RenderStreamConfig};

use super::{native_api, simulated_api};

/// Print the schema stored for `asset`.
pub fn show(config: &RenderStreamConfig, asset: &Path, simulate: bool) -> Result<()> {
    let schema = if simulate {
        load(simulated_api(), asset)?
    } else {
        load(native_api(config), asset)?
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Store the JSON schema in `schema_file` against `asset`.
pub fn save(config: &RenderStreamConfig, asset: &Path, schema_file: &Path, simulate: bool) -> Result<()> {
    let content = std::fs::read_to_string(schema_file)
        .with_context(|| format!("Failed to read {}", schema_file.display()))?;
    let schema: ManagedSchema = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", schema_file.display()))?;
    schema
        .validate()
        .map_err(|e| anyhow!("Invalid schema in {}: {}", schema_file.display(), e))?;

    if simulate {
        store(simulated_api(), asset, &schema)?;
    } else {
        store(native_api(config), asset, &schema)?;
    }
    println!(
        "Saved schema with {} scene(s) and {} channel(s) for {}",
        schema.scenes.len(),
        schema.channels.len(),
        asset.display()
    );
    Ok(())
}

fn load<A: RenderStreamApi>(mut api: A, asset: &Path) -> Result<ManagedSchema> {
    api.initialize().context("Failed to initialise RenderStream")?;
    let schema = api
        .load_schema(asset)
        .with_context(|| format!("Failed to load schema for {}", asset.display()));
    api.shutdown();
    schema
}

fn store<A: RenderStreamApi>(mut api: A, asset: &Path, schema: &ManagedSchema) -> Result<()> {
    api.initialize().context("Failed to initialise RenderStream")?;
    let saved = api
        .save_schema(asset, schema)
        .with_context(|| format!("Failed to save schema for {}", asset.display()));
    api.shutdown();
    saved
}
