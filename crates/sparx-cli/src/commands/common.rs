//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use sparx_backend::BackendKind;
use sparx_circuit::{CircuitOptions, ReturnType};
use sparx_ir::{Param, RecursiveNetlist, Settings};

/// Load a flat or recursive netlist from a JSON file.
pub fn load_netlist(path: &str) -> Result<RecursiveNetlist> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;

    RecursiveNetlist::from_json_str(&source)
        .with_context(|| format!("Failed to parse netlist: {path}"))
}

/// Build options for the CLI: the process-wide cache, optional modes.
pub fn circuit_options(
    backend: BackendKind,
    modes: &[String],
    prune: bool,
    return_type: ReturnType,
) -> CircuitOptions {
    let modes: Vec<String> = modes
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    CircuitOptions {
        backend,
        modes: (!modes.is_empty()).then_some(modes),
        return_type,
        remove_unused_instances: prune,
        ..CircuitOptions::default()
    }
}

/// Parse a backend name.
pub fn parse_backend(name: &str) -> Result<BackendKind> {
    name.parse::<BackendKind>()
        .with_context(|| format!("Available backends: {}", backend_names()))
}

fn backend_names() -> String {
    BackendKind::ALL
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse `key=value` or `key=v1,v2,...`.
pub fn parse_set(arg: &str) -> Result<(String, Param)> {
    let (key, value) = split_assignment(arg)?;
    let values = value
        .split(',')
        .map(|v| parse_number(key, v))
        .collect::<Result<Vec<f64>>>()?;
    let param = match values.as_slice() {
        [single] => Param::Scalar(*single),
        _ => Param::Sweep(values),
    };
    Ok((key.to_string(), param))
}

/// Parse `key=start:stop:n` into a linear sweep.
pub fn parse_sweep(arg: &str) -> Result<(String, Param)> {
    let (key, value) = split_assignment(arg)?;
    let parts: Vec<&str> = value.split(':').collect();
    let [start, stop, n] = parts.as_slice() else {
        anyhow::bail!("Invalid sweep '{arg}': expected key=start:stop:n");
    };
    let start = parse_number(key, start)?;
    let stop = parse_number(key, stop)?;
    let n: usize = n
        .trim()
        .parse()
        .with_context(|| format!("Invalid sample count for '{key}': {n}"))?;
    if n == 0 {
        anyhow::bail!("Sweep of '{key}' needs at least one sample");
    }
    Ok((key.to_string(), Param::linspace(start, stop, n)))
}

/// Collect `--set` and `--sweep` arguments into call settings. Later
/// arguments override earlier ones.
pub fn collect_settings(sets: &[String], sweeps: &[String]) -> Result<Settings> {
    let mut settings = Settings::new();
    for arg in sets {
        let (key, param) = parse_set(arg)?;
        settings.insert(key, param);
    }
    for arg in sweeps {
        let (key, param) = parse_sweep(arg)?;
        settings.insert(key, param);
    }
    Ok(settings)
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => anyhow::bail!("Invalid parameter '{arg}': expected key=value"),
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for '{key}': {value}"))
}
