//! Field-by-field merging of a base config with a variant override.
//!
//! Each field has its own merge rule; there is no generic deep merge:
//!
//! | field              | rule                                              |
//! |--------------------|---------------------------------------------------|
//! | `dependencies`     | non-empty override replaces, otherwise inherit    |
//! | `skip`/`forceSource` | shallow key-wise, override keys win             |
//! | `overrides`        | shallow key-wise, override keys win               |
//! | `copyFiles`        | concatenated, base first                          |
//! | `resolution`       | booleans override-if-set, lists unioned           |
//! | `platformSpecific` | per key: lists unioned, resolution as above       |
//! | `registries`       | unioned, base first                               |
//! | `build`            | per field override-if-set                         |

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::types::{
  BuildConfig, BuildSettings, CopyFile, PackagesConfig, PlatformConfig, Registries, ResolutionConfig, RuleMap,
};
use crate::package::{DependencySpec, normalize};
use crate::platform::PlatformKey;

/// Merge a variant config over a base config.
///
/// Version overrides are not applied yet; [`super::MergedConfig::from_config`]
/// does that and produces the immutable form.
pub fn merge_configs(base: BuildConfig, variant: BuildConfig) -> BuildConfig {
  BuildConfig {
    registries: merge_registries(base.registries, variant.registries),
    build: merge_build_settings(base.build, variant.build),
    packages: merge_packages(base.packages, variant.packages),
  }
}

fn merge_packages(base: PackagesConfig, variant: PackagesConfig) -> PackagesConfig {
  PackagesConfig {
    dependencies: merge_dependencies(base.dependencies, variant.dependencies),
    skip: merge_rule_maps(base.skip, variant.skip),
    force_source: merge_rule_maps(base.force_source, variant.force_source),
    copy_files: merge_copy_files(base.copy_files, variant.copy_files),
    overrides: merge_overrides(base.overrides, variant.overrides),
    resolution: merge_resolution(&base.resolution, &variant.resolution),
    platform_specific: merge_platform_specific(base.platform_specific, variant.platform_specific),
  }
}

/// A non-empty variant list replaces the base list; lists are never concatenated.
pub fn merge_dependencies(base: Vec<String>, variant: Vec<String>) -> Vec<String> {
  if variant.is_empty() {
    base
  } else {
    debug!(base = base.len(), variant = variant.len(), "variant dependency list replaces base");
    variant
  }
}

/// Shallow key-wise merge; a variant entry replaces the whole base entry for
/// that package. Package keys are normalized so spelling variants collide.
pub fn merge_rule_maps(base: RuleMap, variant: RuleMap) -> RuleMap {
  let mut merged: RuleMap = base.into_iter().map(|(name, rules)| (normalize(&name), rules)).collect();
  for (name, rules) in variant {
    merged.insert(normalize(&name), rules);
  }
  merged
}

/// Shallow key-wise merge of version overrides, variant keys win.
pub fn merge_overrides(base: BTreeMap<String, String>, variant: BTreeMap<String, String>) -> BTreeMap<String, String> {
  let mut merged: BTreeMap<String, String> = base.into_iter().map(|(name, v)| (normalize(&name), v)).collect();
  for (name, version) in variant {
    merged.insert(normalize(&name), version);
  }
  merged
}

/// Base entries first, then variant entries.
pub fn merge_copy_files(mut base: Vec<CopyFile>, variant: Vec<CopyFile>) -> Vec<CopyFile> {
  base.extend(variant);
  base
}

/// Booleans: the variant wins whenever it sets a value, including `false`.
/// Lists: always the normalized union of both sides.
pub fn merge_resolution(base: &ResolutionConfig, variant: &ResolutionConfig) -> ResolutionConfig {
  ResolutionConfig {
    allow_source_all: variant.allow_source_all.or(base.allow_source_all),
    strict_missing: variant.strict_missing.or(base.strict_missing),
    allow_source_list: union_normalized(&base.allow_source_list, &variant.allow_source_list),
    force_no_binary_list: union_normalized(&base.force_no_binary_list, &variant.force_no_binary_list),
    only_binary_list: union_normalized(&base.only_binary_list, &variant.only_binary_list),
  }
}

fn union_normalized(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
  a.iter().chain(b.iter()).map(|name| normalize(name)).collect()
}

/// Merge per-platform fragments key by key. A platform is dropped from the
/// result if nothing is left in it.
pub fn merge_platform_specific(
  base: BTreeMap<PlatformKey, PlatformConfig>,
  mut variant: BTreeMap<PlatformKey, PlatformConfig>,
) -> BTreeMap<PlatformKey, PlatformConfig> {
  let mut merged = BTreeMap::new();

  for (key, base_entry) in base {
    let entry = match variant.remove(&key) {
      Some(variant_entry) => merge_platform_entry(base_entry, variant_entry),
      None => merge_platform_entry(base_entry, PlatformConfig::default()),
    };
    merged.insert(key, entry);
  }
  for (key, variant_entry) in variant {
    merged.insert(key, merge_platform_entry(PlatformConfig::default(), variant_entry));
  }

  merged.retain(|key, entry: &mut PlatformConfig| {
    if entry.is_empty() {
      debug!(platform = %key, "dropping empty platform entry");
      false
    } else {
      true
    }
  });
  merged
}

fn merge_platform_entry(base: PlatformConfig, variant: PlatformConfig) -> PlatformConfig {
  PlatformConfig {
    dependencies: union_ordered(base.dependencies, variant.dependencies),
    copy_files: union_ordered(base.copy_files, variant.copy_files),
    resolution: merge_resolution(&base.resolution, &variant.resolution),
    compatibility_tags: union_ordered(base.compatibility_tags, variant.compatibility_tags),
  }
}

/// Order-preserving union: base entries first, then unseen variant entries.
fn union_ordered<T: PartialEq>(base: Vec<T>, variant: Vec<T>) -> Vec<T> {
  let mut out: Vec<T> = Vec::with_capacity(base.len() + variant.len());
  for item in base.into_iter().chain(variant) {
    if !out.contains(&item) {
      out.push(item);
    }
  }
  out
}

pub fn merge_registries(base: Registries, variant: Registries) -> Registries {
  Registries {
    additional: union_ordered(base.additional, variant.additional),
  }
}

pub fn merge_build_settings(base: BuildSettings, variant: BuildSettings) -> BuildSettings {
  BuildSettings {
    enable_logging: variant.enable_logging.or(base.enable_logging),
    timeout: variant.timeout.or(base.timeout),
    python_version: variant.python_version.or(base.python_version),
    python: variant.python.or(base.python),
  }
}

/// Rewrite `name==old` pins to `name==new` for every package named in
/// `overrides`. Only exact name matches on `==` pins are rewritten.
pub fn apply_overrides(dependencies: &[String], overrides: &BTreeMap<String, String>) -> Vec<String> {
  dependencies
    .iter()
    .map(|raw| {
      let spec = DependencySpec::parse(raw);
      let pin = overrides
        .iter()
        .find(|(name, _)| normalize(name) == spec.name.as_str())
        .map(|(_, version)| version.as_str());
      match (spec.pinned_version(), pin) {
        (Some(old), Some(new)) if old != new => {
          debug!(package = %spec.name, from = old, to = %new, "applying version override");
          format!("{}=={}", spec.display_name, new)
        }
        _ => raw.clone(),
      }
    })
    .collect()
}
