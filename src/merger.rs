//! Dependency merging across plugin manifests.
//!
//! The multi-plugin watch installs a single shared `node_modules/` at the
//! root folder. To do that it combines the dependency tables of every plugin
//! into one `package.json`. Conflicting entries whose values are both valid
//! semantic versions are resolved with a [`TieBreak`]; any other conflict
//! keeps the value of the first manifest.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::plugin::{DependencyMap, MANIFEST_FILE, Manifest};

/// The dependency tables of a `package.json`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DependencyCategory {
    /// `dependencies`
    Dependencies,
    /// `devDependencies`
    DevDependencies,
    /// `peerDependencies`
    PeerDependencies,
}

impl DependencyCategory {
    /// Every category, in manifest order.
    pub const ALL: [Self; 3] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::PeerDependencies,
    ];

    /// The JSON key of the category.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
        }
    }
}

/// Rule that picks one of two conflicting semantic versions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Keep the higher version
    #[default]
    Highest,

    /// Keep the lower version
    Lowest,
}

impl TieBreak {
    /// Whether `candidate` should replace `current`.
    ///
    /// Equal versions keep `current`.
    #[must_use]
    pub fn prefers(self, candidate: &Version, current: &Version) -> bool {
        match self {
            Self::Highest => candidate > current,
            Self::Lowest => candidate < current,
        }
    }
}

/// Merged dependency tables, serialized as a minimal `package.json`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencySet {
    /// Runtime dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,

    /// Build-time dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<DependencyMap>,

    /// Peer dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies: Option<DependencyMap>,
}

impl DependencySet {
    /// Borrow one category.
    #[must_use]
    pub fn category(&self, category: DependencyCategory) -> Option<&DependencyMap> {
        match category {
            DependencyCategory::Dependencies => self.dependencies.as_ref(),
            DependencyCategory::DevDependencies => self.dev_dependencies.as_ref(),
            DependencyCategory::PeerDependencies => self.peer_dependencies.as_ref(),
        }
    }

    fn category_mut(&mut self, category: DependencyCategory) -> &mut Option<DependencyMap> {
        match category {
            DependencyCategory::Dependencies => &mut self.dependencies,
            DependencyCategory::DevDependencies => &mut self.dev_dependencies,
            DependencyCategory::PeerDependencies => &mut self.peer_dependencies,
        }
    }

    /// Write the set as `package.json` inside `root`.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub fn write_manifest(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join(MANIFEST_FILE);
        fs::write(&path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }

    /// Pretty-printed JSON with four space indentation.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

impl From<&Manifest> for DependencySet {
    fn from(manifest: &Manifest) -> Self {
        Self {
            dependencies: manifest.dependencies.clone(),
            dev_dependencies: manifest.dev_dependencies.clone(),
            peer_dependencies: manifest.peer_dependencies.clone(),
        }
    }
}

/// Merge the dependency tables of any number of manifests.
///
/// Built by folding [`merge_pair`] over the manifests, starting from an empty
/// set.
pub fn merge<'a, I>(manifests: I, tie_break: TieBreak) -> DependencySet
where
    I: IntoIterator<Item = &'a Manifest>,
{
    manifests
        .into_iter()
        .fold(DependencySet::default(), |acc, manifest| {
            merge_pair(&acc, &DependencySet::from(manifest), tie_break)
        })
}

/// Merge two dependency sets.
///
/// For each category: if both sides declare it, the result holds the union
/// of their keys; if one side declares it, it passes through; if neither
/// does, it stays undeclared.
#[must_use]
pub fn merge_pair(first: &DependencySet, second: &DependencySet, tie_break: TieBreak) -> DependencySet {
    let mut merged = DependencySet::default();

    for category in DependencyCategory::ALL {
        *merged.category_mut(category) = match (first.category(category), second.category(category))
        {
            (Some(a), Some(b)) => Some(merge_maps(a, b, tie_break)),
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (None, None) => None,
        };
    }

    merged
}

fn merge_maps(first: &DependencyMap, second: &DependencyMap, tie_break: TieBreak) -> DependencyMap {
    let mut merged = first.clone();

    for (name, constraint) in second {
        match merged.get_mut(name) {
            Some(existing) => {
                if let Some(chosen) = resolve(existing, constraint, tie_break) {
                    *existing = chosen;
                }
            }
            None => {
                merged.insert(name.clone(), constraint.clone());
            }
        }
    }

    merged
}

/// Pick between two version strings.
///
/// Returns `Some(second)` only when both parse as semantic versions and the
/// tie-break prefers the second one. Constraints such as `^1.2.0` are not
/// versions, so the first value wins.
fn resolve(first: &str, second: &str, tie_break: TieBreak) -> Option<String> {
    let (Ok(a), Ok(b)) = (Version::parse(first), Version::parse(second)) else {
        return None;
    };

    tie_break.prefers(&b, &a).then(|| second.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(entries: &[(&str, &str)]) -> Option<DependencyMap> {
        Some(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    fn manifest(dependencies: Option<DependencyMap>) -> Manifest {
        Manifest {
            dependencies,
            ..Manifest::default()
        }
    }

    #[test]
    fn test_higher_version_wins_by_default() {
        let a = manifest(deps(&[("a", "1.0.0")]));
        let b = manifest(deps(&[("a", "1.2.0")]));

        let merged = merge([&a, &b], TieBreak::default());

        assert_eq!(merged.dependencies, deps(&[("a", "1.2.0")]));
        assert!(merged.dev_dependencies.is_none());
        assert!(merged.peer_dependencies.is_none());
    }

    #[test]
    fn test_lowest_tie_break() {
        let a = manifest(deps(&[("a", "2.0.0")]));
        let b = manifest(deps(&[("a", "1.9.9")]));

        let merged = merge([&a, &b], TieBreak::Lowest);

        assert_eq!(merged.dependencies, deps(&[("a", "1.9.9")]));
    }

    #[test]
    fn test_union_of_keys_per_category() {
        let a = Manifest {
            dependencies: deps(&[("a", "1.0.0"), ("b", "2.0.0")]),
            dev_dependencies: deps(&[("esbuild", "0.17.3")]),
            ..Manifest::default()
        };
        let b = Manifest {
            dependencies: deps(&[("b", "2.1.0"), ("c", "0.1.0")]),
            peer_dependencies: deps(&[("obsidian", "1.4.0")]),
            ..Manifest::default()
        };

        let merged = merge([&a, &b], TieBreak::Highest);

        assert_eq!(
            merged.dependencies,
            deps(&[("a", "1.0.0"), ("b", "2.1.0"), ("c", "0.1.0")])
        );
        assert_eq!(merged.dev_dependencies, deps(&[("esbuild", "0.17.3")]));
        assert_eq!(merged.peer_dependencies, deps(&[("obsidian", "1.4.0")]));
    }

    #[test]
    fn test_non_semver_keeps_first_value() {
        let a = manifest(deps(&[("obsidian", "latest")]));
        let b = manifest(deps(&[("obsidian", "1.4.11")]));

        assert_eq!(
            merge([&a, &b], TieBreak::Highest).dependencies,
            deps(&[("obsidian", "latest")])
        );
        assert_eq!(
            merge([&b, &a], TieBreak::Highest).dependencies,
            deps(&[("obsidian", "1.4.11")])
        );
    }

    #[test]
    fn test_range_constraints_are_not_versions() {
        let a = manifest(deps(&[("tslib", "^2.4.0")]));
        let b = manifest(deps(&[("tslib", "^2.6.0")]));

        assert_eq!(
            merge([&a, &b], TieBreak::Highest).dependencies,
            deps(&[("tslib", "^2.4.0")])
        );
    }

    #[test]
    fn test_commutative_for_semver_values() {
        let a = Manifest {
            dependencies: deps(&[("a", "1.0.0"), ("b", "3.0.0")]),
            dev_dependencies: deps(&[("x", "0.1.0")]),
            ..Manifest::default()
        };
        let b = Manifest {
            dependencies: deps(&[("a", "1.0.1"), ("b", "2.9.0"), ("c", "1.0.0")]),
            ..Manifest::default()
        };

        for tie_break in [TieBreak::Highest, TieBreak::Lowest] {
            assert_eq!(merge([&a, &b], tie_break), merge([&b, &a], tie_break));
        }
    }

    #[test]
    fn test_associative_over_many_manifests() {
        let a = manifest(deps(&[("a", "1.0.0")]));
        let b = manifest(deps(&[("a", "3.0.0")]));
        let c = manifest(deps(&[("a", "2.0.0")]));

        let left = merge_pair(
            &merge_pair(&(&a).into(), &(&b).into(), TieBreak::Highest),
            &(&c).into(),
            TieBreak::Highest,
        );
        let right = merge_pair(
            &(&a).into(),
            &merge_pair(&(&b).into(), &(&c).into(), TieBreak::Highest),
            TieBreak::Highest,
        );

        assert_eq!(left, right);
        assert_eq!(left, merge([&a, &b, &c], TieBreak::Highest));
    }

    #[test]
    fn test_category_absent_everywhere_is_omitted() {
        let merged = merge([&Manifest::default(), &Manifest::default()], TieBreak::Highest);

        assert_eq!(merged, DependencySet::default());
        assert_eq!(merged.to_json().unwrap(), "{}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(merge(std::iter::empty::<&Manifest>(), TieBreak::Highest), DependencySet::default());
    }

    #[test]
    fn test_to_json_uses_four_spaces() {
        let set = DependencySet {
            dependencies: deps(&[("a", "1.0.0")]),
            ..DependencySet::default()
        };

        assert_eq!(
            set.to_json().unwrap(),
            "{\n    \"dependencies\": {\n        \"a\": \"1.0.0\"\n    }\n}"
        );
    }

    #[test]
    fn test_write_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let set = DependencySet {
            dev_dependencies: deps(&[("typescript", "4.7.4")]),
            ..DependencySet::default()
        };

        let path = set.write_manifest(tmp.path()).unwrap();
        let read_back = Manifest::read(tmp.path()).unwrap();

        assert_eq!(path, tmp.path().join("package.json"));
        assert_eq!(DependencySet::from(&read_back), set);
    }

    #[test]
    fn test_category_keys() {
        let keys: Vec<_> = DependencyCategory::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["dependencies", "devDependencies", "peerDependencies"]);
    }
}
