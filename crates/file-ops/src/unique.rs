//! Collision-free output path selection.

use std::path::{Path, PathBuf};

/// Returns `path` if nothing exists there, otherwise the first free
/// `base-N.ext` variant for `N = 1, 2, …`.
///
/// The split is on the last dot only (`archive.tar.gz` → `archive.tar-1.gz`);
/// names without an extension get a bare `-N` suffix. The check is advisory
/// and racy: a caller that needs true uniqueness must open the returned path
/// with create-exclusive semantics.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (stem, ext) = match base.rfind('.') {
        Some(idx) => (&base[..idx], &base[idx..]),
        None => (base.as_str(), ""),
    };

    for n in 1u64.. {
        let candidate = dir.join(format!("{stem}-{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("suffix space exhausted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn free_path_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testfile.mp3");
        assert_eq!(unique_path(&path), path);
    }

    #[test]
    fn suffix_increments_past_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testfile.mp3");

        File::create(&path).unwrap();
        let next = unique_path(&path);
        assert_eq!(next, dir.path().join("testfile-1.mp3"));

        File::create(&next).unwrap();
        assert_eq!(unique_path(&path), dir.path().join("testfile-2.mp3"));
    }

    #[test]
    fn splits_on_last_dot_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        File::create(&path).unwrap();
        assert_eq!(unique_path(&path), dir.path().join("archive.tar-1.gz"));
    }

    #[test]
    fn extensionless_names_get_bare_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README");
        File::create(&path).unwrap();
        assert_eq!(unique_path(&path), dir.path().join("README-1"));
    }

    #[test]
    fn returned_path_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        File::create(&path).unwrap();
        for _ in 0..3 {
            let next = unique_path(&path);
            assert!(!next.exists());
            File::create(&next).unwrap();
        }
    }
}
