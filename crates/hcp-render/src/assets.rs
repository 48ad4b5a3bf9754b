//! Template asset catalog
//!
//! Templates are addressed by logical path, one component directory per
//! control plane component (e.g. `kube-apiserver/kube-apiserver-deployment.yaml`).
//! The catalog supports reading one asset and listing the files of a
//! directory; the cluster-bootstrap group discovers its members that way.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Read-only collection of template assets
pub trait AssetSource: Send + Sync {
    /// Content of the asset at `name`, or `None` if the catalog has no such asset
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Base names of the files directly under `dir`, sorted
    ///
    /// Subdirectories are not included. A missing directory is an
    /// [`Error::Asset`]; a directory holding no files lists as empty.
    fn list_dir(&self, dir: &str) -> Result<Vec<String>>;
}

/// Asset catalog rooted at a filesystem directory
#[derive(Clone, Debug)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Serve assets from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a logical name below the root, refusing anything that escapes it
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(Error::asset(
                name,
                "asset names must be relative catalog paths",
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for DirectoryAssets {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::io(path, e))
    }

    fn list_dir(&self, dir: &str) -> Result<Vec<String>> {
        let path = self.resolve(dir)?;
        if !path.is_dir() {
            return Err(Error::asset(dir, "no such asset directory"));
        }
        let entries = std::fs::read_dir(&path).map_err(|e| Error::io(&path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&path, e))?;
            let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    return Err(Error::asset(
                        dir,
                        format!("non UTF-8 file name {}", raw.to_string_lossy()),
                    ))
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory asset catalog
///
/// Useful for embedding templates in a binary and for tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssets {
    assets: BTreeMap<String, String>,
}

impl MemoryAssets {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, replacing any previous content at `name`
    pub fn with(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    /// Add an asset, replacing any previous content at `name`
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.assets.insert(name.into(), content.into());
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for MemoryAssets {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut assets = Self::new();
        for (name, content) in iter {
            assets.insert(name, content);
        }
        assets
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.assets.get(name).cloned())
    }

    fn list_dir(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let below: Vec<&str> = self
            .assets
            .range(prefix.clone()..)
            .take_while(|(name, _)| name.starts_with(&prefix))
            .map(|(name, _)| &name[prefix.len()..])
            .collect();

        // A directory exists as long as something lives below it
        if below.is_empty() {
            return Err(Error::asset(dir, "no such asset directory"));
        }
        Ok(below
            .into_iter()
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_and_missing() {
        let assets = MemoryAssets::new().with("etcd/etcd-cluster.yaml", "kind: EtcdCluster");
        assert_eq!(
            assets.read("etcd/etcd-cluster.yaml").unwrap().as_deref(),
            Some("kind: EtcdCluster")
        );
        assert_eq!(assets.read("etcd/absent.yaml").unwrap(), None);
    }

    #[test]
    fn memory_list_dir_is_sorted_and_shallow() {
        let assets: MemoryAssets = [
            ("cluster-bootstrap/b.yaml", "b"),
            ("cluster-bootstrap/a.yaml", "a"),
            ("cluster-bootstrap/nested/c.yaml", "c"),
            ("cluster-bootstrap-other/d.yaml", "d"),
            ("etcd/e.yaml", "e"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            assets.list_dir("cluster-bootstrap").unwrap(),
            vec!["a.yaml", "b.yaml"]
        );
    }

    #[test]
    fn memory_list_missing_dir_fails() {
        let assets = MemoryAssets::new().with("etcd/e.yaml", "e");
        let err = assets.list_dir("cluster-bootstrap").unwrap_err();
        assert!(matches!(err, Error::Asset { .. }));
    }

    // =========================================================================
    // Story: Both catalogs list directories the same way
    // =========================================================================

    /// The same layout as a directory tree and as an in-memory map
    fn both_catalogs() -> (tempfile::TempDir, Vec<Box<dyn AssetSource>>) {
        let layout = [
            ("cluster-bootstrap/b.yaml", "b"),
            ("cluster-bootstrap/a.yaml", "a"),
            ("only-nested/inner/c.yaml", "c"),
        ];
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in layout {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        let memory: MemoryAssets = layout.into_iter().collect();
        let directory = DirectoryAssets::new(dir.path());
        let catalogs: Vec<Box<dyn AssetSource>> = vec![Box::new(directory), Box::new(memory)];
        (dir, catalogs)
    }

    #[test]
    fn story_catalogs_agree_on_listing() {
        let (_dir, catalogs) = both_catalogs();
        for catalog in &catalogs {
            assert_eq!(
                catalog.list_dir("cluster-bootstrap").unwrap(),
                vec!["a.yaml", "b.yaml"]
            );
            assert!(catalog.list_dir("only-nested").unwrap().is_empty());
        }
    }

    #[test]
    fn story_catalogs_agree_on_missing_directory() {
        let (_dir, catalogs) = both_catalogs();
        for catalog in &catalogs {
            let err = catalog.list_dir("absent-dir").unwrap_err();
            assert!(matches!(err, Error::Asset { ref name, .. } if name == "absent-dir"));
        }
    }

    // =========================================================================
    // Story: Directory-backed catalog
    // =========================================================================

    #[test]
    fn story_directory_catalog_reads_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let bootstrap = dir.path().join("cluster-bootstrap");
        std::fs::create_dir_all(bootstrap.join("nested")).unwrap();
        std::fs::write(bootstrap.join("z-last.yaml"), "z").unwrap();
        std::fs::write(bootstrap.join("00-first.yaml"), "first").unwrap();
        std::fs::write(bootstrap.join("nested/ignored.yaml"), "x").unwrap();

        let assets = DirectoryAssets::new(dir.path());
        assert_eq!(
            assets.list_dir("cluster-bootstrap").unwrap(),
            vec!["00-first.yaml", "z-last.yaml"]
        );
        assert_eq!(
            assets
                .read("cluster-bootstrap/00-first.yaml")
                .unwrap()
                .as_deref(),
            Some("first")
        );
        assert_eq!(assets.read("cluster-bootstrap/absent.yaml").unwrap(), None);
    }

    #[test]
    fn story_directory_catalog_refuses_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let assets = DirectoryAssets::new(dir.path());
        assert!(assets.read("../etc/passwd").is_err());
        assert!(assets.read("/etc/passwd").is_err());
        assert!(assets.read("").is_err());
    }
}
