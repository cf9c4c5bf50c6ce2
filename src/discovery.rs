// ==============================================================================
// discovery.rs - Archive MAF Discovery
// ==============================================================================
// Description: Locates per-project GDC MAF files under a release root
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Layout: <root>/<project dir>/<file>
//   somatic:   TCGA.<cancer>.<caller>.<uuid>.somatic.maf.gz
//   protected: TCGA.<cancer>.<caller>.<uuid>.protected.maf.gz
// ==============================================================================

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Release root {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("No {kind} MAF files found under {root}")]
    NoFiles { kind: &'static str, root: PathBuf },
}

/// Which archive release flavor to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Somatic,
    Protected,
}

impl ArchiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Somatic => "somatic",
            ArchiveKind::Protected => "protected",
        }
    }

    /// File name test (`TCGA.*.somatic.maf.gz` / `TCGA*.protected.maf.gz`)
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            ArchiveKind::Somatic => file_name.starts_with("TCGA.") && file_name.ends_with(".somatic.maf.gz"),
            ArchiveKind::Protected => file_name.starts_with("TCGA") && file_name.ends_with(".protected.maf.gz"),
        }
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Sorted archive files one directory below `root`
pub fn discover_archive_files(root: &Path, kind: ArchiveKind) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }
    debug!("Scanning {:?} for {} MAF files", root, kind.as_str());

    // Follow linked files and project directories; skip hidden project directories
    let walker = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() != 1 || !is_hidden(entry));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(|name| kind.matches(name)) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(DiscoveryError::NoFiles {
            kind: kind.as_str(),
            root: root.to_path_buf(),
        });
    }

    files.sort();
    info!("Found {} {} MAF files under {:?}", files.len(), kind.as_str(), root);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_file_name_patterns() {
        assert!(ArchiveKind::Somatic.matches("TCGA.BRCA.mutect.abc.DR-10.0.somatic.maf.gz"));
        assert!(!ArchiveKind::Somatic.matches("TCGA.BRCA.mutect.abc.DR-10.0.protected.maf.gz"));
        assert!(!ArchiveKind::Somatic.matches("TCGA-BRCA.somatic.maf.gz"));
        assert!(!ArchiveKind::Somatic.matches("TCGA.BRCA.mutect.somatic.maf"));

        assert!(ArchiveKind::Protected.matches("TCGA.LUAD.varscan.abc.protected.maf.gz"));
        assert!(ArchiveKind::Protected.matches("TCGA-LUAD.protected.maf.gz"));
        assert!(!ArchiveKind::Protected.matches("MC3.protected.maf.gz"));
    }

    #[test]
    fn test_discovers_one_level_down_sorted() {
        let root = tempdir().unwrap();
        touch(&root.path().join("uuid-b/TCGA.LUAD.mutect.b.somatic.maf.gz"));
        touch(&root.path().join("uuid-a/TCGA.BRCA.muse.a.somatic.maf.gz"));
        touch(&root.path().join("uuid-a/TCGA.BRCA.muse.a.protected.maf.gz"));
        touch(&root.path().join("uuid-c/annotations.txt"));
        // Too shallow and too deep
        touch(&root.path().join("TCGA.OV.mutect.x.somatic.maf.gz"));
        touch(&root.path().join("uuid-d/nested/TCGA.OV.mutect.y.somatic.maf.gz"));

        let somatic = discover_archive_files(root.path(), ArchiveKind::Somatic).unwrap();
        assert_eq!(
            somatic,
            vec![
                root.path().join("uuid-a/TCGA.BRCA.muse.a.somatic.maf.gz"),
                root.path().join("uuid-b/TCGA.LUAD.mutect.b.somatic.maf.gz"),
            ]
        );

        let protected = discover_archive_files(root.path(), ArchiveKind::Protected).unwrap();
        assert_eq!(protected.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let root = tempdir().unwrap();
        let mirror = tempdir().unwrap();
        let target = mirror.path().join("TCGA.BRCA.mutect.a.somatic.maf.gz");
        touch(&target);
        touch(&mirror.path().join("project-b/TCGA.LUAD.muse.b.somatic.maf.gz"));

        fs::create_dir_all(root.path().join("uuid-a")).unwrap();
        symlink(&target, root.path().join("uuid-a/TCGA.BRCA.mutect.a.somatic.maf.gz")).unwrap();
        symlink(mirror.path().join("project-b"), root.path().join("uuid-b")).unwrap();

        let somatic = discover_archive_files(root.path(), ArchiveKind::Somatic).unwrap();
        assert_eq!(
            somatic,
            vec![
                root.path().join("uuid-a/TCGA.BRCA.mutect.a.somatic.maf.gz"),
                root.path().join("uuid-b/TCGA.LUAD.muse.b.somatic.maf.gz"),
            ]
        );
    }

    #[test]
    fn test_skips_hidden_project_directories() {
        let root = tempdir().unwrap();
        touch(&root.path().join("uuid-a/TCGA.BRCA.mutect.a.somatic.maf.gz"));
        touch(&root.path().join(".trash/TCGA.OV.mutect.old.somatic.maf.gz"));

        let somatic = discover_archive_files(root.path(), ArchiveKind::Somatic).unwrap();
        assert_eq!(somatic, vec![root.path().join("uuid-a/TCGA.BRCA.mutect.a.somatic.maf.gz")]);

        fs::remove_dir_all(root.path().join("uuid-a")).unwrap();
        assert!(matches!(
            discover_archive_files(root.path(), ArchiveKind::Somatic),
            Err(DiscoveryError::NoFiles { .. })
        ));
    }

    #[test]
    fn test_empty_root_is_an_error() {
        let root = tempdir().unwrap();
        touch(&root.path().join("uuid-a/readme.txt"));

        let err = discover_archive_files(root.path(), ArchiveKind::Somatic).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoFiles { kind: "somatic", .. }));

        let missing = root.path().join("does-not-exist");
        assert!(matches!(
            discover_archive_files(&missing, ArchiveKind::Somatic),
            Err(DiscoveryError::NotADirectory(_))
        ));
    }
}
