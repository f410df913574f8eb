//! # Error Suggestions
//!
//! Turns library errors into CLI errors that say what went wrong and how to
//! fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kustomize::suggestions;
//!
//! let map = target::build(&dir, options).map_err(suggestions::explain)?;
//! ```

use crate::error::Error;
use crate::plugins::{BUILTIN_GENERATORS, BUILTIN_TRANSFORMERS};

/// Generate an error for a directory without a kustomization file.
pub fn config_not_found(dir: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "unable to find one of 'kustomization.yaml', 'kustomization.yml' or 'Kustomization' in directory '{dir}'\n\n\
         hint: Create a kustomization.yaml in that directory\n\
         hint: Check that the path passed to the command is the root you meant"
    )
}

/// Generate an error for an external plugin that the build did not enable.
pub fn plugins_disabled(plugin: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "plugin {plugin} requires external plugins, which are not enabled\n\n\
         hint: Pass --enable-exec to allow exec and container plugins\n\
         hint: Set the KUSTOMIZE_ENABLE_EXEC environment variable"
    )
}

/// Generate an error for a cycle between bases.
pub fn cycle_detected(cycle: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cycle detected in base references: {cycle}\n\n\
         hint: Remove one of the 'resources' entries to break the cycle\n\
         hint: Move shared resources into a base both roots can reference"
    )
}

/// Generate an error for a plugin timeout.
pub fn plugin_timeout(plugin: &str, seconds: u64) -> anyhow::Error {
    anyhow::anyhow!(
        "plugin {plugin} timed out after {seconds}s\n\n\
         hint: Raise the limit with --plugin-timeout <SECS>"
    )
}

/// Generate an error for a plugin document whose kind is not built in.
pub fn unknown_plugin_kind(kind: &str, source: &Error) -> anyhow::Error {
    let mut known: Vec<&str> = BUILTIN_GENERATORS.to_vec();
    known.extend_from_slice(BUILTIN_TRANSFORMERS);
    let did_you_mean = find_similar(kind, &known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();
    anyhow::anyhow!(
        "{source}{did_you_mean}\n\n\
         Built-in plugin kinds are: {kinds}\n\
         hint: External plugins need a config.kubernetes.io/function annotation",
        kinds = known.join(", ")
    )
}

/// Convert a library error into a CLI error, adding hints where one
/// applies.
///
/// The full error chain is kept in the message either way.
pub fn explain(err: Error) -> anyhow::Error {
    let chain = chain_of(&err);
    match err.root_cause() {
        Error::NotFound { dir } if chain.len() == 1 => config_not_found(dir),
        Error::CycleDetected { cycle } => cycle_detected(cycle).context(chain.join(": ")),
        Error::PluginExecution { plugin, message, .. }
            if message.contains("external plugins are not enabled") =>
        {
            plugins_disabled(plugin)
        }
        Error::PluginExecution { message, .. } if message.starts_with("unknown plugin kind") => {
            let kind = message.split('\'').nth(1).unwrap_or_default();
            unknown_plugin_kind(kind, err.root_cause())
        }
        Error::PluginTimeout { plugin, timeout } => plugin_timeout(plugin, timeout.as_secs()),
        _ => anyhow::Error::new(err),
    }
}

fn chain_of(err: &Error) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = err;
    while let Error::BaseResolution { path, source } = current {
        chain.push(format!("accumulating base '{}'", path));
        current = source;
    }
    chain.push(current.to_string());
    chain
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut current = vec![i; b.len() + 1];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        previous = current;
    }
    previous[b.len()]
}
