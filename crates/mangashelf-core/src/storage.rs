//! Disk side of the cover pipeline.
//!
//! Covers are packaged as single-entry zip archives. The archive is written
//! to `<dest>.part`, synced, then renamed into place, so a destination that
//! exists is always complete and can be skipped on the next run.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.zip` → `a.zip.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// True if a finished archive already exists at `path`.
pub fn cover_exists(path: &Path) -> bool {
    path.is_file()
}

/// Create `dir` and any missing parents. An existing directory is not an error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))
}

/// Write `data` as the only entry (`entry_name`) of a zip archive at `dest`.
///
/// Returns the archive size in bytes. On failure the temp file is removed and
/// `dest` is left untouched.
pub fn write_single_entry_zip(dest: &Path, entry_name: &str, data: &[u8]) -> Result<u64> {
    let tmp = temp_path(dest);
    match write_archive(&tmp, entry_name, data) {
        Ok(()) => {}
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    }
    fs::rename(&tmp, dest)
        .with_context(|| format!("failed to rename {} to {}", tmp.display(), dest.display()))?;
    let size = fs::metadata(dest)
        .with_context(|| format!("stat {}", dest.display()))?
        .len();
    Ok(size)
}

fn write_archive(tmp: &Path, entry_name: &str, data: &[u8]) -> Result<()> {
    let file = File::create(tmp)
        .with_context(|| format!("failed to create temp file: {}", tmp.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)
        .with_context(|| format!("start zip entry {}", entry_name))?;
    zip.write_all(data).context("write zip entry")?;
    let writer = zip.finish().context("finish zip archive")?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all().context("sync archive")?;
    Ok(())
}
