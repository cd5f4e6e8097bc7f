//! Payroll template workbooks and the per-driver documents seeded from them.
//!
//! A [`Template`] keeps the original xlsx package bytes plus the XML of the
//! worksheet that receives writes (the workbook's active tab). An
//! [`OutputDocument`] is an independent copy of a template with a set of
//! cell writes; it is serialized by copying every package part verbatim,
//! replacing the patched worksheet and leaving out the calculation chain.

pub mod cell_ref;
pub(crate) mod package;
pub mod sheet_xml;

#[cfg(test)]
pub(crate) mod test_support;

pub use cell_ref::CellRef;

use self::package::{PackageEdits, active_sheet, calc_chain_removal, read_entry};
use self::sheet_xml::patch_sheet_xml;
use crate::error::{Result, StamperError};
use crate::models::CellValue;

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A loaded template workbook
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    package: Arc<[u8]>,
    sheet_path: String,
    sheet_xml: Arc<str>,
    edits: Arc<PackageEdits>,
}

impl Template {
    /// Load a template workbook from disk
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| StamperError::storage(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    /// Parse a template from xlsx package bytes
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| StamperError::template(format!("{name} is not an xlsx package: {e}")))?;

        let sheet_path = active_sheet(&mut archive)?.part;
        let sheet_xml = read_entry(&mut archive, &sheet_path)?;
        let edits = calc_chain_removal(&mut archive)?;
        drop(archive);
        debug!("Template {} writes into {}", name, sheet_path);
        if !edits.dropped.is_empty() {
            debug!("Output copies leave out {}", edits.dropped.join(", "));
        }

        Ok(Self {
            name,
            package: Arc::from(bytes),
            sheet_path,
            sheet_xml: Arc::from(sheet_xml),
            edits: Arc::new(edits),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package path of the worksheet receiving writes
    pub fn sheet_path(&self) -> &str {
        &self.sheet_path
    }
}

/// One driver's workbook: a template copy plus the cells written into it
#[derive(Debug, Clone)]
pub struct OutputDocument {
    driver_name: String,
    template: Template,
    cells: BTreeMap<CellRef, CellValue>,
    write_log: Vec<CellRef>,
}

impl OutputDocument {
    /// Copy-construct a fresh document from the template
    pub fn seed(template: &Template, driver_name: impl Into<String>) -> Self {
        Self {
            driver_name: driver_name.into(),
            template: template.clone(),
            cells: BTreeMap::new(),
            write_log: Vec::new(),
        }
    }

    pub fn write(&mut self, cell: CellRef, value: CellValue) {
        self.cells.insert(cell, value);
        self.write_log.push(cell);
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Value written to `cell` during this run, if any
    pub fn cell(&self, cell: CellRef) -> Option<&CellValue> {
        self.cells.get(&cell)
    }

    pub fn cells(&self) -> &BTreeMap<CellRef, CellValue> {
        &self.cells
    }

    /// How many times `cell` was written
    pub fn write_count(&self, cell: CellRef) -> usize {
        self.write_log.iter().filter(|c| **c == cell).count()
    }

    /// Serialize the document as a complete xlsx package
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        let patched = patch_sheet_xml(&self.template.sheet_xml, &self.cells)?;
        let mut archive = ZipArchive::new(Cursor::new(&self.template.package[..]))
            .map_err(|e| StamperError::template(format!("template package unreadable: {e}")))?;
        let mut out = ZipWriter::new(Cursor::new(Vec::with_capacity(
            self.template.package.len() + patched.len(),
        )));

        let edits = &self.template.edits;
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| StamperError::template(format!("failed to read zip entry {i}: {e}")))?;
            let name = entry.name().to_string();

            if edits.drops(&name) {
                continue;
            }
            let replacement = if name == self.template.sheet_path {
                Some(patched.as_str())
            } else {
                edits.replacement(&name)
            };

            match replacement {
                Some(content) => {
                    drop(entry);
                    let opts = SimpleFileOptions::default()
                        .compression_method(CompressionMethod::Deflated);
                    out.start_file(name, opts).map_err(assembly_error)?;
                    out.write_all(content.as_bytes()).map_err(assembly_error)?;
                }
                None => out.raw_copy_file(entry).map_err(assembly_error)?,
            }
        }

        let cursor = out.finish().map_err(assembly_error)?;
        Ok(cursor.into_inner())
    }
}

fn assembly_error(err: impl std::fmt::Display) -> StamperError {
    StamperError::template(format!("failed to assemble output workbook: {err}"))
}
