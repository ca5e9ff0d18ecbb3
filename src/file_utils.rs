use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::MigrateError;

/// Lazily yield every file or symlink below `root` whose name matches `pattern`.
///
/// Directories are visited in file-name order, so the sequence is stable for
/// a given tree. Traversal errors are passed through to the caller; symlinks
/// are yielded but not followed. Names that are not valid UTF-8 are matched
/// in their lossy form.
pub fn scan_subtree<'a>(
    root: &Path,
    pattern: &'a Pattern,
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(e) => {
                let kind = e.file_type();
                let matches = (kind.is_file() || kind.is_symlink())
                    && pattern.matches(&e.file_name().to_string_lossy());
                matches.then(|| Ok(e.into_path()))
            }
            Err(err) => Some(Err(err)),
        })
}

/// Check that `path` exists and is a readable directory.
pub fn validate_directory(path: &Path) -> Result<PathBuf, String> {
    let abs = fs::canonicalize(path)
        .map_err(|e| format!("unable to access directory \"{}\": {}", path.display(), e))?;
    if !abs.is_dir() {
        return Err(format!("\"{}\" is not a directory", path.display()));
    }
    fs::read_dir(&abs)
        .map_err(|e| format!("unable to read directory \"{}\": {}", path.display(), e))?;
    Ok(abs)
}

/// Temp file sitting next to `file`: `<name>.tmp<pid>`.
pub fn temp_path_for(file: &Path, pid: u32) -> PathBuf {
    let mut name: OsString = file.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".tmp{}", pid));
    file.with_file_name(name)
}

/// Remove a leftover temp file from an earlier, aborted run.
pub fn remove_stale(temp: &Path) -> Result<(), MigrateError> {
    match fs::remove_file(temp) {
        Ok(()) => {
            tracing::debug!(temp = %temp.display(), "removed stale temp file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MigrateError::io(temp, e)),
    }
}

/// Put `temp` in place of `original`: delete, then rename.
///
/// The two calls follow each other directly. If the delete fails the
/// original is still intact and the error is per-file. If the rename fails
/// the data only exists under the temp name, reported as
/// [`MigrateError::ReplaceInterrupted`].
pub fn replace_file(temp: &Path, original: &Path) -> Result<(), MigrateError> {
    fs::remove_file(original).map_err(|e| MigrateError::io(original, e))?;
    fs::rename(temp, original).map_err(|source| MigrateError::ReplaceInterrupted {
        original: original.to_path_buf(),
        temp: temp.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RUNTIME_CSV;
    use tempfile::tempdir;

    #[test]
    fn scan_finds_matching_files_in_nested_dirs() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b/deep")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("top-runtime.csv"), "x").unwrap();
        fs::write(root.join("a/one-runtime.csv"), "x").unwrap();
        fs::write(root.join("a/one-expense.csv"), "x").unwrap();
        fs::write(root.join("b/deep/two-runtime.csv"), "x").unwrap();
        fs::write(root.join("b/deep/two-runtime.csv.tmp99"), "x").unwrap();
        // a directory whose name matches is not a file
        fs::create_dir_all(root.join("dir-runtime.csv")).unwrap();

        let found: Vec<PathBuf> = scan_subtree(root, &RUNTIME_CSV)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            found,
            vec![
                root.join("a/one-runtime.csv"),
                root.join("b/deep/two-runtime.csv"),
                root.join("top-runtime.csv"),
            ]
        );
    }

    #[test]
    fn scan_is_deterministic() {
        let tmp = tempdir().unwrap();
        for name in ["z-runtime.csv", "m-runtime.csv", "a-runtime.csv"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }
        let first: Vec<_> = scan_subtree(tmp.path(), &RUNTIME_CSV)
            .filter_map(Result::ok)
            .collect();
        let second: Vec<_> = scan_subtree(tmp.path(), &RUNTIME_CSV)
            .filter_map(Result::ok)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first[0], tmp.path().join("a-runtime.csv"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn scan_yields_symlinks_and_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let odd = root.join(OsStr::from_bytes(b"c\xff-runtime.csv"));
        fs::write(root.join("target.csv"), "x").unwrap();
        fs::write(&odd, "x").unwrap();
        std::os::unix::fs::symlink(root.join("target.csv"), root.join("a-runtime.csv")).unwrap();

        let found: Vec<PathBuf> = scan_subtree(root, &RUNTIME_CSV)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(found, vec![root.join("a-runtime.csv"), odd]);
    }

    #[test]
    fn validate_directory_rejects_missing_and_plain_files() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert!(validate_directory(tmp.path()).is_ok());
        assert!(validate_directory(&file).is_err());
        assert!(validate_directory(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn temp_path_appends_pid_suffix() {
        let p = temp_path_for(Path::new("/data/test/synth-runtime.csv"), 4711);
        assert_eq!(p, PathBuf::from("/data/test/synth-runtime.csv.tmp4711"));
    }

    #[test]
    fn remove_stale_ignores_missing_file() {
        let tmp = tempdir().unwrap();
        let temp = tmp.path().join("x-runtime.csv.tmp1");
        remove_stale(&temp).unwrap();
        fs::write(&temp, "old").unwrap();
        remove_stale(&temp).unwrap();
        assert!(!temp.exists());
    }

    #[test]
    fn replace_file_swaps_content() {
        let tmp = tempdir().unwrap();
        let original = tmp.path().join("x-runtime.csv");
        let temp = tmp.path().join("x-runtime.csv.tmp1");
        fs::write(&original, "old").unwrap();
        fs::write(&temp, "new").unwrap();

        replace_file(&temp, &original).unwrap();

        assert_eq!(fs::read_to_string(&original).unwrap(), "new");
        assert!(!temp.exists());
    }

    #[test]
    fn replace_file_keeps_original_when_delete_fails() {
        let tmp = tempdir().unwrap();
        let original = tmp.path().join("missing-runtime.csv");
        let temp = tmp.path().join("missing-runtime.csv.tmp1");
        fs::write(&temp, "new").unwrap();

        let err = replace_file(&temp, &original).unwrap_err();
        assert!(!err.is_fatal());
        assert!(temp.exists());
    }

    #[test]
    fn replace_file_reports_interrupted_rename() {
        let tmp = tempdir().unwrap();
        let original = tmp.path().join("x-runtime.csv");
        let temp = tmp.path().join("gone.tmp1");
        fs::write(&original, "old").unwrap();

        let err = replace_file(&temp, &original).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, MigrateError::ReplaceInterrupted { .. }));
    }
}
