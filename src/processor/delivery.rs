//! Output delivery.
//!
//! Serializes each driver's workbook, names it after the driver, and
//! writes the set to disk as individual files, as one zip archive, or
//! both. Files are staged in a hidden directory next to their destination
//! and only moved into place once every workbook has been written, so a
//! failed delivery leaves no partial output behind.

use super::Batch;
use crate::constants::{OUTPUT_EXTENSION, STAGING_DIR_PREFIX, UNNAMED_DRIVER_STEM};
use crate::error::{Result, StamperError};

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A serialized workbook ready to be written
#[derive(Debug, Clone)]
pub struct RenderedOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// File name for a driver's workbook
///
/// Path separators, characters reserved on common file systems, and
/// control characters become `_`. Leading and trailing spaces and dots are
/// dropped; a name with nothing left becomes `unnamed`.
pub fn output_file_name(driver_name: &str) -> String {
    format!("{}.{}", file_stem(driver_name), OUTPUT_EXTENSION)
}

fn file_stem(driver_name: &str) -> String {
    let replaced: String = driver_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if stem.is_empty() {
        UNNAMED_DRIVER_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Serialize every workbook of the batch under a unique file name
///
/// Names that collide after sanitizing (compared case-insensitively) get
/// a ` (2)`, ` (3)`, ... suffix in first-seen order.
pub fn render_outputs(batch: &Batch) -> Result<Vec<RenderedOutput>> {
    let mut taken = HashSet::new();
    batch
        .documents()
        .iter()
        .map(|document| {
            let stem = file_stem(document.driver_name());
            let mut file_name = format!("{stem}.{OUTPUT_EXTENSION}");
            let mut n = 2;
            while !taken.insert(file_name.to_lowercase()) {
                file_name = format!("{stem} ({n}).{OUTPUT_EXTENSION}");
                n += 1;
            }
            let bytes = document.to_xlsx_bytes()?;
            debug!(
                "Rendered {} ({} bytes) for '{}'",
                file_name,
                bytes.len(),
                document.driver_name()
            );
            Ok(RenderedOutput { file_name, bytes })
        })
        .collect()
}

/// Write each rendered workbook into `output_dir`
///
/// Existing files with the same names are replaced. Returns the final
/// paths in batch order.
pub fn write_outputs(outputs: &[RenderedOutput], output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).map_err(|e| StamperError::storage(output_dir, e))?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_DIR_PREFIX)
        .tempdir_in(output_dir)
        .map_err(|e| StamperError::storage(output_dir, e))?;

    for output in outputs {
        let staged = staging.path().join(&output.file_name);
        fs::write(&staged, &output.bytes).map_err(|e| StamperError::storage(&staged, e))?;
    }

    let mut written = Vec::with_capacity(outputs.len());
    for output in outputs {
        let staged = staging.path().join(&output.file_name);
        let target = output_dir.join(&output.file_name);
        fs::rename(&staged, &target).map_err(|e| StamperError::storage(&target, e))?;
        written.push(target);
    }

    staging
        .close()
        .map_err(|e| StamperError::storage(output_dir, e))?;
    info!(
        "Wrote {} workbooks to {}",
        written.len(),
        output_dir.display()
    );
    Ok(written)
}

/// Bundle every rendered workbook into one deflated zip archive
pub fn write_archive(outputs: &[RenderedOutput], archive_path: &Path) -> Result<PathBuf> {
    let parent = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StamperError::storage(parent, e))?;

    let mut staged =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| StamperError::storage(parent, e))?;
    {
        let mut zip = ZipWriter::new(staged.as_file_mut());
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for output in outputs {
            zip.start_file(output.file_name.as_str(), opts)
                .map_err(|e| StamperError::storage(archive_path, e))?;
            zip.write_all(&output.bytes)
                .map_err(|e| StamperError::storage(archive_path, e))?;
        }
        zip.finish()
            .map_err(|e| StamperError::storage(archive_path, e))?;
    }

    staged
        .persist(archive_path)
        .map_err(|e| StamperError::storage(archive_path, e.error))?;
    info!(
        "Archived {} workbooks into {}",
        outputs.len(),
        archive_path.display()
    );
    Ok(archive_path.to_path_buf())
}
