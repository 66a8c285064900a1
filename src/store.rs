//! Note store: loads a vault directory into an in-memory snapshot.
//!
//! Walks the vault root recursively, applies include/exclude globs, reads
//! each matching file, and returns the notes sorted by id. `.git`,
//! `node_modules`, `target`, and every dot-directory are always skipped.
//!
//! Loading is all-or-nothing: any unreadable file aborts the run with a
//! [`LoadError`], because statistics over a partial vault are misleading.

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vault_graph_core::{DomainTable, Note};
use walkdir::{DirEntry, WalkDir};

use crate::config::VaultConfig;

/// Fatal failure to load the vault.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("vault root does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("vault root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid glob pattern '{pattern}'")]
    BadGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk vault")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read note {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All notes of one run, loaded once.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub root: PathBuf,
    /// Sorted by id.
    pub notes: Vec<Note>,
    /// SHA-256 over every note's id and text, in id order.
    pub fingerprint: String,
}

pub fn load_vault(config: &VaultConfig, domains: &DomainTable) -> Result<Snapshot, LoadError> {
    let root = &config.root;
    if !root.exists() {
        return Err(LoadError::MissingRoot(root.clone()));
    }
    if !root.is_dir() {
        return Err(LoadError::NotADirectory(root.clone()));
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut notes = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            log::trace!("skipping {}", rel_str);
            continue;
        }

        notes.push(read_note(path, &rel_str, domains)?);
    }

    // Sort for deterministic ordering
    notes.sort_by(|a, b| a.id.cmp(&b.id));
    let fingerprint = fingerprint(&notes);
    log::info!(
        "loaded {} notes from {} (snapshot {})",
        notes.len(),
        root.display(),
        &fingerprint[..12]
    );

    Ok(Snapshot {
        root: root.clone(),
        notes,
        fingerprint,
    })
}

/// Read one note file. Used by the loader and by the applier's re-checks.
pub fn read_note(path: &Path, rel_path: &str, domains: &DomainTable) -> Result<Note, LoadError> {
    let body = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);
    Ok(Note::from_text(rel_path, body, modified, domains))
}

/// Content fingerprint of a snapshot; equal for unchanged vaults.
pub fn fingerprint(notes: &[Note]) -> String {
    let mut hasher = Sha256::new();
    for note in notes {
        hasher.update(note.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(note.body.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, LoadError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| LoadError::BadGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| LoadError::BadGlob {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vault(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, body) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        tmp
    }

    fn config(root: &Path) -> VaultConfig {
        VaultConfig {
            root: root.to_path_buf(),
            ..VaultConfig::default()
        }
    }

    #[test]
    fn test_loads_sorted_markdown_only() {
        let tmp = vault(&[
            ("thoughts/ideas/b.md", "B"),
            ("daily/2024-01-01.md", "D"),
            ("a.md", "A"),
            ("image.png", "x"),
            ("notes.txt", "t"),
        ]);
        let snap = load_vault(&config(tmp.path()), &DomainTable::default_table()).unwrap();
        let ids: Vec<&str> = snap.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "daily/2024-01-01", "thoughts/ideas/b"]);
        assert_eq!(snap.notes[2].domain, "thoughts/ideas");
        assert!(snap.notes[0].modified.is_some());
    }

    #[test]
    fn test_skips_hidden_and_default_excludes() {
        let tmp = vault(&[
            ("keep.md", ""),
            (".obsidian/workspace.md", ""),
            (".trash/old.md", ""),
            ("node_modules/pkg/readme.md", ""),
            ("sub/.git/x.md", ""),
            ("templates/t.md", ""),
        ]);
        let mut cfg = config(tmp.path());
        cfg.exclude_globs = vec!["templates/**".to_string()];
        let snap = load_vault(&cfg, &DomainTable::default_table()).unwrap();
        let ids: Vec<&str> = snap.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["keep"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = load_vault(&config(&tmp.path().join("gone")), &DomainTable::default_table())
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingRoot(_)));
    }

    #[test]
    fn test_bad_glob_is_reported() {
        let tmp = vault(&[("a.md", "")]);
        let mut cfg = config(tmp.path());
        cfg.include_globs = vec!["a[".to_string()];
        let err = load_vault(&cfg, &DomainTable::default_table()).unwrap_err();
        assert!(matches!(err, LoadError::BadGlob { .. }));
    }

    #[test]
    fn test_unreadable_note_aborts_load() {
        let tmp = vault(&[("ok.md", "fine")]);
        fs::write(tmp.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        let err = load_vault(&config(tmp.path()), &DomainTable::default_table()).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let tmp = vault(&[("a.md", "one"), ("b.md", "two")]);
        let table = DomainTable::default_table();
        let first = load_vault(&config(tmp.path()), &table).unwrap().fingerprint;
        let again = load_vault(&config(tmp.path()), &table).unwrap().fingerprint;
        assert_eq!(first, again);
        assert_eq!(first.len(), 64);

        fs::write(tmp.path().join("b.md"), "changed").unwrap();
        let changed = load_vault(&config(tmp.path()), &table).unwrap().fingerprint;
        assert_ne!(first, changed);
    }
}
