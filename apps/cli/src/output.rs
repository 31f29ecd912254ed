//! Writes pulled files to disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use fieldlink_protocol::DownloadedFile;
use fieldlink_transfer::validate_remote_name;

/// Writes every file under `<root>/<job_id>/<name>` and returns the paths.
///
/// Each file is written to a temporary sibling first and renamed into
/// place, so a partially written file never carries its final name.
pub fn write_job(
    root: &Path,
    job_id: &str,
    files: &[DownloadedFile],
) -> anyhow::Result<Vec<PathBuf>> {
    validate_remote_name(job_id)
        .with_context(|| format!("job id {job_id:?} is not a valid directory name"))?;
    if job_id == "." || job_id.contains('/') || job_id.contains('\\') {
        anyhow::bail!("job id {job_id:?} must not contain path separators");
    }

    let dir = root.join(job_id);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        validate_remote_name(&file.name)?;
        let path = dir.join(&file.name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension(match path.extension() {
            Some(ext) => format!("{}.part", ext.to_string_lossy()),
            None => "part".to_string(),
        });
        std::fs::write(&tmp, &file.data)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("renaming to {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = file.data.len(), "file written");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, data: &[u8]) -> DownloadedFile {
        DownloadedFile {
            name: name.into(),
            size_bytes: data.len() as u64,
            content_hash: String::new(),
            job_id: "c-1".into(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn writes_under_job_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let files = [file("a.ubx", b"aaaa"), file("logs/b.txt", b"bb")];

        let paths = write_job(tmp.path(), "c-1", &files).unwrap();

        assert_eq!(paths[0], tmp.path().join("c-1").join("a.ubx"));
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"aaaa");
        assert_eq!(std::fs::read(tmp.path().join("c-1/logs/b.txt")).unwrap(), b"bb");
        assert!(!tmp.path().join("c-1/a.ubx.part").exists());
    }

    #[test]
    fn empty_job_creates_directory_only() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = write_job(tmp.path(), "c-2", &[]).unwrap();
        assert!(paths.is_empty());
        assert!(tmp.path().join("c-2").is_dir());
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_job(tmp.path(), "c-1", &[file("a.ubx", b"old")]).unwrap();
        write_job(tmp.path(), "c-1", &[file("a.ubx", b"new")]).unwrap();
        assert_eq!(std::fs::read(tmp.path().join("c-1/a.ubx")).unwrap(), b"new");
    }

    #[test]
    fn rejects_escaping_job_id() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(write_job(tmp.path(), "../evil", &[]).is_err());
        assert!(write_job(tmp.path(), "a/b", &[]).is_err());
        assert!(write_job(tmp.path(), ".", &[]).is_err());
    }
}
