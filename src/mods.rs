//! The immutable mod catalog: metadata, capabilities, and the provider table.
//!
//! Everything in here is computed once when the collection is loaded and never mutated
//! afterwards, so it can be shared freely between the search service and the UI.

pub mod loader;
pub mod set;
pub mod version;

use crate::mods::set::ModSet;
use crate::mods::version::{Version, VersionReq};
use serde::Serialize;
use std::collections::BTreeMap;

/// An opaque string naming either a mod or a capability a mod provides. Two namespaces share the
/// syntax: a mod always provides its own ID, and may provide additional capability IDs.
pub type ModId = String;

/// Capabilities satisfied by the host environment itself. These get synthetic providers at
/// version `0.0.0` and are never resolved as real dependencies.
pub const IMPLICIT_CAPABILITIES: [&str; 4] = ["java", "minecraft", "fabricloader", "quilt_loader"];

/// Whether `id` names an implicit capability.
pub fn is_implicit(id: &str) -> bool {
    IMPLICIT_CAPABILITIES.contains(&id)
}

/// Everything known about a single mod after loading. Immutable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModMetadata {
    pub id: ModId,
    pub version: Version,
    /// Capability requirements. Every requirement in an entry's list must hold; an empty list
    /// accepts any version.
    pub depends: BTreeMap<ModId, Vec<VersionReq>>,
    /// Capabilities this mod cannot coexist with, same shape as `depends` but a single matching
    /// requirement is enough to reject.
    pub breaks: BTreeMap<ModId, Vec<VersionReq>>,
    /// Extra capability IDs declared by the mod itself.
    pub provides: ModSet,
    /// Modules embedded in the mod's jar, flattened by the loader.
    pub embedded: Vec<EmbeddedModule>,
    /// The jar name without the `.jar` / `.jar.disabled` suffix.
    pub base_filename: String,
    /// Whether the jar was enabled when the collection was loaded.
    pub initially_active: bool,
}

/// A module shipped inside another mod's jar. Participates in capability resolution through the
/// parent mod.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EmbeddedModule {
    pub id: ModId,
    pub version: Version,
    pub provides: ModSet,
}

/// One candidate provider for a capability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProviderInfo {
    /// The top-level mod to activate to obtain the capability.
    pub mod_id: ModId,
    /// The version at which the capability is provided. For embedded modules this is the
    /// module's own version, not the parent's.
    pub provided_version: Version,
    /// The top-level mod's version.
    pub mod_version: Version,
    /// Declared by the mod itself rather than by an embedded module.
    pub direct: bool,
}

/// The loaded collection: per-mod metadata plus the capability provider table.
#[derive(Debug)]
pub struct ModCatalog {
    mods: BTreeMap<ModId, ModMetadata>,
    providers: BTreeMap<ModId, Vec<ProviderInfo>>,
    sorted_ids: Vec<ModId>,
}

impl ModMetadata {
    /// Every capability this mod brings when activated, with the highest provided version kept
    /// when a capability is declared more than once. Always includes the mod's own ID.
    pub fn effective_provides(&self) -> BTreeMap<ModId, Version> {
        let mut provided = BTreeMap::new();

        let mut record = |id: &ModId, version: &Version| {
            provided
                .entry(id.clone())
                .and_modify(|known: &mut Version| {
                    if version > known {
                        *known = version.clone();
                    }
                })
                .or_insert_with(|| version.clone());
        };

        record(&self.id, &self.version);
        for id in self.provides.iter() {
            record(id, &self.version);
        }

        for module in &self.embedded {
            record(&module.id, &module.version);
            for id in module.provides.iter() {
                record(id, &module.version);
            }
        }

        provided
    }
}

impl ModCatalog {
    /// Build the catalog from loaded metadata. Duplicate mod IDs resolve to the highest version.
    pub fn new(mods: Vec<ModMetadata>) -> Self {
        let mut deduped: BTreeMap<ModId, ModMetadata> = BTreeMap::new();
        for metadata in mods {
            match deduped.get(&metadata.id) {
                Some(known) if known.version >= metadata.version => {}
                _ => {
                    deduped.insert(metadata.id.clone(), metadata);
                }
            }
        }

        let mut providers: BTreeMap<ModId, Vec<ProviderInfo>> = BTreeMap::new();
        for capability in IMPLICIT_CAPABILITIES {
            providers.insert(
                capability.to_string(),
                vec![ProviderInfo {
                    mod_id: capability.to_string(),
                    provided_version: Version::zero(),
                    mod_version: Version::zero(),
                    direct: true,
                }],
            );
        }

        for metadata in deduped.values() {
            let direct: ModSet = std::iter::once(&metadata.id).chain(metadata.provides.iter()).collect();

            for (capability, version) in metadata.effective_provides() {
                providers.entry(capability.clone()).or_default().push(ProviderInfo {
                    mod_id: metadata.id.clone(),
                    provided_version: version,
                    mod_version: metadata.version.clone(),
                    direct: direct.contains(&capability),
                });
            }
        }

        // Preference order: highest provided version first, direct declarations before embedded
        // ones, then mod ID as the final determinism tie-break.
        for candidates in providers.values_mut() {
            candidates.sort_by(|a, b| {
                b.provided_version
                    .cmp(&a.provided_version)
                    .then_with(|| b.direct.cmp(&a.direct))
                    .then_with(|| a.mod_id.cmp(&b.mod_id))
            });
        }

        let sorted_ids = deduped.keys().cloned().collect();

        Self {
            mods: deduped,
            providers,
            sorted_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ModMetadata> {
        self.mods.get(id)
    }

    /// All mod IDs in lexicographic order.
    pub fn ids(&self) -> &[ModId] {
        &self.sorted_ids
    }

    /// All metadata in lexicographic ID order.
    pub fn mods(&self) -> impl Iterator<Item = &ModMetadata> {
        self.mods.values()
    }

    /// Providers of `capability` in preference order. Empty when nothing provides it.
    pub fn providers_of(&self, capability: &str) -> &[ProviderInfo] {
        self.providers.get(capability).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The full provider table in lexicographic capability order.
    pub fn providers(&self) -> impl Iterator<Item = (&ModId, &[ProviderInfo])> {
        self.providers.iter().map(|(id, list)| (id, list.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str, version: &str) -> ModMetadata {
        ModMetadata {
            id: id.to_string(),
            version: Version::parse(version),
            depends: BTreeMap::new(),
            breaks: BTreeMap::new(),
            provides: ModSet::new(),
            embedded: Vec::new(),
            base_filename: id.to_string(),
            initially_active: true,
        }
    }

    #[test]
    fn duplicate_ids_keep_the_highest_version() {
        let catalog = ModCatalog::new(vec![metadata("mod_a", "1.0.0"), metadata("mod_a", "1.2.0")]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("mod_a").unwrap().version, Version::parse("1.2.0"));
    }

    #[test]
    fn effective_provides_includes_own_id_and_embedded_modules() {
        let mut parent = metadata("parent", "2.0.0");
        parent.provides.insert("api".to_string());
        parent.embedded.push(EmbeddedModule {
            id: "nested".to_string(),
            version: Version::parse("0.3.0"),
            provides: ModSet::new(),
        });

        let provided = parent.effective_provides();
        assert_eq!(provided["parent"], Version::parse("2.0.0"));
        assert_eq!(provided["api"], Version::parse("2.0.0"));
        assert_eq!(provided["nested"], Version::parse("0.3.0"));
    }

    #[test]
    fn repeated_capability_keeps_the_highest_version() {
        let mut parent = metadata("parent", "1.0.0");
        parent.provides.insert("api".to_string());
        parent.embedded.push(EmbeddedModule {
            id: "api".to_string(),
            version: Version::parse("3.0.0"),
            provides: ModSet::new(),
        });

        assert_eq!(parent.effective_provides()["api"], Version::parse("3.0.0"));
    }

    #[test]
    fn providers_are_ordered_by_version_directness_then_id() {
        let mut old_direct = metadata("old_direct", "1.0.0");
        old_direct.provides.insert("api".to_string());

        let mut new_embedded = metadata("new_embedded", "1.0.0");
        new_embedded.embedded.push(EmbeddedModule {
            id: "api".to_string(),
            version: Version::parse("2.0.0"),
            provides: ModSet::new(),
        });

        let mut new_direct_b = metadata("b_direct", "2.0.0");
        new_direct_b.provides.insert("api".to_string());
        let mut new_direct_a = metadata("a_direct", "2.0.0");
        new_direct_a.provides.insert("api".to_string());

        let catalog = ModCatalog::new(vec![old_direct, new_embedded, new_direct_b, new_direct_a]);
        let order: Vec<&str> = catalog
            .providers_of("api")
            .iter()
            .map(|provider| provider.mod_id.as_str())
            .collect();

        assert_eq!(order, ["a_direct", "b_direct", "new_embedded", "old_direct"]);
    }

    #[test]
    fn implicit_capabilities_have_synthetic_providers() {
        let catalog = ModCatalog::new(vec![]);

        for capability in IMPLICIT_CAPABILITIES {
            let providers = catalog.providers_of(capability);
            assert_eq!(providers.len(), 1);
            assert_eq!(providers[0].provided_version, Version::zero());
        }
    }
}
