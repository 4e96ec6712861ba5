//! Loading a mod collection from a mods directory.
//!
//! Jar archives are never opened: each mod's manifest is expected to sit next to its jar as
//! `<base>.fabric.mod.json`, using the same schema as the embedded `fabric.mod.json`, with any
//! nested jar modules flattened into an `embedded` array. The jar's on-disk state decides the
//! rest: `<base>.jar` means enabled, `<base>.jar.disabled` means disabled, and neither means the
//! file has gone missing since the manifest was written.

use crate::mods::set::ModSet;
use crate::mods::version::{Version, VersionReq};
use crate::mods::{EmbeddedModule, ModCatalog, ModMetadata};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The manifest filename suffix the loader scans for.
pub const MANIFEST_SUFFIX: &str = ".fabric.mod.json";

/// The result of scanning a mods directory.
#[derive(Debug)]
pub struct LoadedCollection {
    pub catalog: ModCatalog,
    /// Mods whose manifest was found but whose jar is gone in both the enabled and disabled
    /// spelling.
    pub missing: ModSet,
}

/// The subset of the `fabric.mod.json` schema the tool consumes.
#[derive(Debug, Deserialize)]
struct ModManifest {
    id: String,
    version: String,
    #[serde(default)]
    depends: BTreeMap<String, Requirements>,
    #[serde(default)]
    breaks: BTreeMap<String, Requirements>,
    #[serde(default)]
    provides: Vec<String>,
    #[serde(default)]
    embedded: Vec<EmbeddedManifest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedManifest {
    id: String,
    version: String,
    #[serde(default)]
    provides: Vec<String>,
}

/// Dependency entries come as either a single requirement string or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Requirements {
    One(String),
    Many(Vec<String>),
}

impl Requirements {
    fn parse(&self) -> Vec<VersionReq> {
        match self {
            Requirements::One(text) => vec![VersionReq::parse(text)],
            Requirements::Many(texts) => texts.iter().map(|text| VersionReq::parse(text)).collect(),
        }
    }
}

/// Scan `dir` for mod manifests and build the catalog. Unreadable or invalid manifests are
/// logged and skipped so that one broken file does not block a whole bisection session.
/// `progress` is called once per discovered manifest with (processed, total).
pub fn load_mods(dir: &Path, mut progress: impl FnMut(usize, usize)) -> Result<LoadedCollection> {
    let manifest_paths = find_manifests(dir)
        .with_context(|| format!("Could not scan the mods directory '{}'", dir.display()))?;

    let mut mods = Vec::with_capacity(manifest_paths.len());
    let mut missing = ModSet::new();

    for (index, manifest_path) in manifest_paths.iter().enumerate() {
        progress(index + 1, manifest_paths.len());

        let metadata = match read_manifest(manifest_path) {
            Ok(metadata) => metadata,
            Err(err) => {
                log::warn!("Skipping '{}': {:#}", manifest_path.display(), err);
                continue;
            }
        };

        if !metadata.initially_active && !jar_path(manifest_path, false).exists() {
            missing.insert(metadata.id.clone());
        }

        mods.push(metadata);
    }

    // A duplicate ID resolves to the highest version inside the catalog; its loser may still
    // have claimed a missing jar, which must not stick to the surviving entry.
    let catalog = ModCatalog::new(mods);
    let missing = missing
        .iter()
        .filter(|id| {
            catalog
                .get(id)
                .is_none_or(|metadata| !jar_exists(dir, &metadata.base_filename))
        })
        .collect();

    Ok(LoadedCollection { catalog, missing })
}

fn find_manifests(dir: &Path) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(dir.is_dir(), "'{}' is not a directory", dir.display());

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(MANIFEST_SUFFIX))
        })
        .map(|entry| entry.into_path())
        .collect();

    paths.sort();
    Ok(paths)
}

fn read_manifest(manifest_path: &Path) -> Result<ModMetadata> {
    let text = std::fs::read_to_string(manifest_path).context("Could not read the manifest")?;
    let manifest: ModManifest = serde_json::from_str(&text).context("Could not parse the manifest")?;

    let base_filename = manifest_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(MANIFEST_SUFFIX))
        .context("Manifest filename is not valid UTF-8")?
        .to_string();

    Ok(ModMetadata {
        version: Version::parse(&manifest.version),
        depends: parse_requirement_map(&manifest.depends),
        breaks: parse_requirement_map(&manifest.breaks),
        provides: manifest.provides.into_iter().collect(),
        embedded: manifest
            .embedded
            .into_iter()
            .map(|module| EmbeddedModule {
                id: module.id,
                version: Version::parse(&module.version),
                provides: module.provides.into_iter().collect(),
            })
            .collect(),
        initially_active: jar_path(manifest_path, true).exists(),
        base_filename,
        id: manifest.id,
    })
}

fn parse_requirement_map(entries: &BTreeMap<String, Requirements>) -> BTreeMap<String, Vec<VersionReq>> {
    entries
        .iter()
        .map(|(id, requirements)| (id.clone(), requirements.parse()))
        .collect()
}

/// The jar path corresponding to a manifest, in its enabled or disabled spelling.
fn jar_path(manifest_path: &Path, enabled: bool) -> PathBuf {
    let name = manifest_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(MANIFEST_SUFFIX))
        .unwrap_or_default();

    let suffix = if enabled { ".jar" } else { ".jar.disabled" };
    manifest_path.with_file_name(format!("{name}{suffix}"))
}

fn jar_exists(dir: &Path, base_filename: &str) -> bool {
    dir.join(format!("{base_filename}.jar")).exists() || dir.join(format!("{base_filename}.jar.disabled")).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, base: &str, json: &str) {
        fs::write(dir.join(format!("{base}{MANIFEST_SUFFIX}")), json).unwrap();
    }

    fn write_jar(dir: &Path, base: &str, enabled: bool) {
        let suffix = if enabled { ".jar" } else { ".jar.disabled" };
        fs::write(dir.join(format!("{base}{suffix}")), b"jar").unwrap();
    }

    #[test]
    fn loads_manifests_and_jar_state() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "alpha-1.0",
            r#"{"id": "alpha", "version": "1.0.0", "depends": {"beta": ">=2.0"}}"#,
        );
        write_jar(dir.path(), "alpha-1.0", true);
        write_manifest(dir.path(), "beta-2.1", r#"{"id": "beta", "version": "2.1.0"}"#);
        write_jar(dir.path(), "beta-2.1", false);

        let loaded = load_mods(dir.path(), |_, _| {}).unwrap();

        let alpha = loaded.catalog.get("alpha").unwrap();
        assert!(alpha.initially_active);
        assert_eq!(alpha.base_filename, "alpha-1.0");
        assert_eq!(alpha.depends["beta"].len(), 1);

        let beta = loaded.catalog.get("beta").unwrap();
        assert!(!beta.initially_active);
        assert!(loaded.missing.is_empty());
    }

    #[test]
    fn manifest_without_jar_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "ghost", r#"{"id": "ghost", "version": "1.0.0"}"#);

        let loaded = load_mods(dir.path(), |_, _| {}).unwrap();
        assert!(loaded.missing.contains("ghost"));
        assert!(!loaded.catalog.get("ghost").unwrap().initially_active);
    }

    #[test]
    fn duplicate_ids_resolve_to_the_highest_version() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "thing-1.0", r#"{"id": "thing", "version": "1.0.0"}"#);
        write_jar(dir.path(), "thing-1.0", true);
        write_manifest(dir.path(), "thing-1.5", r#"{"id": "thing", "version": "1.5.0"}"#);
        write_jar(dir.path(), "thing-1.5", true);

        let loaded = load_mods(dir.path(), |_, _| {}).unwrap();
        let thing = loaded.catalog.get("thing").unwrap();

        assert_eq!(thing.version, Version::parse("1.5.0"));
        assert_eq!(thing.base_filename, "thing-1.5");
    }

    #[test]
    fn invalid_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "broken", "not json");
        write_manifest(dir.path(), "fine", r#"{"id": "fine", "version": "1.0.0"}"#);
        write_jar(dir.path(), "fine", true);

        let loaded = load_mods(dir.path(), |_, _| {}).unwrap();
        assert_eq!(loaded.catalog.len(), 1);
        assert!(loaded.catalog.get("fine").is_some());
    }

    #[test]
    fn embedded_modules_reach_the_provider_table() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "bundle",
            r#"{
                "id": "bundle",
                "version": "1.0.0",
                "embedded": [{"id": "library", "version": "0.4.0", "provides": ["library-api"]}]
            }"#,
        );
        write_jar(dir.path(), "bundle", true);

        let loaded = load_mods(dir.path(), |_, _| {}).unwrap();
        let providers = loaded.catalog.providers_of("library-api");

        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].mod_id, "bundle");
        assert!(!providers[0].direct);
        assert_eq!(providers[0].provided_version, Version::parse("0.4.0"));
    }

    #[test]
    fn progress_reports_every_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "a", r#"{"id": "a", "version": "1.0.0"}"#);
        write_manifest(dir.path(), "b", r#"{"id": "b", "version": "1.0.0"}"#);

        let mut seen = Vec::new();
        load_mods(dir.path(), |done, total| seen.push((done, total))).unwrap();
        assert_eq!(seen, [(1, 2), (2, 2)]);
    }
}
