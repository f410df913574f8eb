//! Built-in ConfigMap and Secret generators
//!
//! Both read key/value pairs from three sources, in this order: `.env`
//! files, literals, and files. A key may appear only once per generator.
//! The generated resource carries its generation behavior and, unless the
//! options disable it, a request for a content-hash name suffix.

use super::Generator;
use crate::config::{GeneratorArgs, GeneratorOptions};
use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::resmap::ResMap;
use crate::resource::{GenerationBehavior, Resource};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Generates one ConfigMap
#[derive(Debug, Clone)]
pub struct ConfigMapGenerator {
    args: GeneratorArgs,
    options: GeneratorOptions,
    loader: FileLoader,
}

impl ConfigMapGenerator {
    /// `defaults` are the root's `generatorOptions`; the entry's own
    /// options win over them.
    pub fn new(args: GeneratorArgs, defaults: &GeneratorOptions, loader: FileLoader) -> Self {
        let options = args.options.clone().unwrap_or_default().over(defaults);
        Self {
            args,
            options,
            loader,
        }
    }
}

impl Generator for ConfigMapGenerator {
    fn name(&self) -> String {
        format!("ConfigMapGenerator/{}", self.args.name)
    }

    fn generate(&self) -> Result<ResMap> {
        let pairs = collect_pairs(&self.args, &self.loader, &self.name())?;
        let mut res = base_resource("ConfigMap", &self.args, &self.options, &self.name())?;

        let mut data = Mapping::new();
        let mut binary = Mapping::new();
        for (key, bytes) in pairs {
            match String::from_utf8(bytes) {
                Ok(text) => {
                    data.insert(key.into(), text.into());
                }
                Err(e) => {
                    binary.insert(key.into(), STANDARD.encode(e.into_bytes()).into());
                }
            }
        }
        let doc = crate::resource::ensure_mapping(res.value_mut());
        if !data.is_empty() {
            doc.insert("data".into(), Value::Mapping(data));
        }
        if !binary.is_empty() {
            doc.insert("binaryData".into(), Value::Mapping(binary));
        }
        if self.options.immutable {
            doc.insert("immutable".into(), true.into());
        }

        let mut map = ResMap::new();
        map.append(res)?;
        Ok(map)
    }
}

/// Generates one Secret
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    args: GeneratorArgs,
    secret_type: String,
    options: GeneratorOptions,
    loader: FileLoader,
}

impl SecretGenerator {
    pub fn new(
        args: GeneratorArgs,
        secret_type: Option<String>,
        defaults: &GeneratorOptions,
        loader: FileLoader,
    ) -> Self {
        let options = args.options.clone().unwrap_or_default().over(defaults);
        Self {
            args,
            secret_type: secret_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Opaque".to_string()),
            options,
            loader,
        }
    }
}

impl Generator for SecretGenerator {
    fn name(&self) -> String {
        format!("SecretGenerator/{}", self.args.name)
    }

    fn generate(&self) -> Result<ResMap> {
        let pairs = collect_pairs(&self.args, &self.loader, &self.name())?;
        let mut res = base_resource("Secret", &self.args, &self.options, &self.name())?;

        let mut data = Mapping::new();
        for (key, bytes) in pairs {
            data.insert(key.into(), STANDARD.encode(bytes).into());
        }
        let doc = crate::resource::ensure_mapping(res.value_mut());
        doc.insert("type".into(), self.secret_type.as_str().into());
        if !data.is_empty() {
            doc.insert("data".into(), Value::Mapping(data));
        }
        if self.options.immutable {
            doc.insert("immutable".into(), true.into());
        }

        let mut map = ResMap::new();
        map.append(res)?;
        Ok(map)
    }
}

fn base_resource(
    kind: &str,
    args: &GeneratorArgs,
    options: &GeneratorOptions,
    generator: &str,
) -> Result<Resource> {
    if args.name.is_empty() {
        return Err(Error::Generator {
            generator: generator.to_string(),
            message: "a name is required".to_string(),
        });
    }
    let mut res = Resource::new("v1", kind, &args.name, Some(&args.namespace));
    for (key, value) in &options.labels {
        res.set_label(key, value);
    }
    for (key, value) in &options.annotations {
        res.set_annotation(key, value);
    }
    if args.behavior != GenerationBehavior::Unspecified {
        res.set_behavior(args.behavior);
    }
    res.set_needs_hash_suffix(!options.disable_name_suffix_hash);
    res.set_origin(generator);
    debug!("generated {}", res.cur_id());
    Ok(res)
}

/// Gather key/value pairs from env files, literals and files.
fn collect_pairs(
    args: &GeneratorArgs,
    loader: &FileLoader,
    generator: &str,
) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut pairs = BTreeMap::new();
    let mut insert = |key: String, value: Vec<u8>| -> Result<()> {
        if pairs.contains_key(&key) {
            return Err(Error::Generator {
                generator: generator.to_string(),
                message: format!("duplicate key '{}'", key),
            });
        }
        pairs.insert(key, value);
        Ok(())
    };

    for env_file in args.envs.iter().chain(args.env.iter()) {
        let content = loader.load_string(env_file)?;
        for (key, value) in parse_env_file(&content, env_file, generator)? {
            insert(key, value.into_bytes())?;
        }
    }
    for literal in &args.literals {
        let (key, value) = parse_literal(literal, generator)?;
        insert(key, value.into_bytes())?;
    }
    for source in &args.files {
        let (key, path) = parse_file_source(source, generator)?;
        insert(key, loader.load(&path)?)?;
    }
    Ok(pairs)
}

/// Split `KEY=VALUE`, dropping one level of matching quotes around the value.
pub fn parse_literal(literal: &str, generator: &str) -> Result<(String, String)> {
    let (key, value) = literal.split_once('=').ok_or_else(|| Error::Generator {
        generator: generator.to_string(),
        message: format!("invalid literal source '{}', expected key=value", literal),
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::Generator {
            generator: generator.to_string(),
            message: format!("invalid literal source '{}', key is empty", literal),
        });
    }
    Ok((key.to_string(), unquote(value).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Split `[key=]path`; without a key the file name is used.
fn parse_file_source(source: &str, generator: &str) -> Result<(String, String)> {
    let (key, path) = match source.split_once('=') {
        Some((key, path)) => (key.trim().to_string(), path.trim().to_string()),
        None => {
            let key = Path::new(source)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            (key, source.to_string())
        }
    };
    if key.is_empty() || path.is_empty() {
        return Err(Error::Generator {
            generator: generator.to_string(),
            message: format!("invalid file source '{}'", source),
        });
    }
    Ok((key, path))
}

fn parse_env_file(content: &str, file: &str, generator: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| Error::Generator {
            generator: generator.to_string(),
            message: format!("{} line {}: expected KEY=VALUE", file, number + 1),
        })?;
        out.push((key.trim().to_string(), value.to_string()));
    }
    Ok(out)
}
