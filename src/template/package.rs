//! xlsx package plumbing.
//!
//! Follows the package relationships from `_rels/.rels` to the workbook part
//! and from the workbook's relationships to its worksheets. Used to find the
//! active tab of both the template and the trip log, and to strip the
//! calculation chain from stamped copies.

use crate::error::{Result, StamperError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub(crate) type PackageArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

const PACKAGE_RELS: &str = "_rels/.rels";
const CONTENT_TYPES: &str = "[Content_Types].xml";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const CALC_CHAIN_REL: &str = "/calcChain";

/// The worksheet a workbook opens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveSheet {
    /// Tab name as shown in Excel
    pub name: String,
    /// Package path of the worksheet part
    pub part: String,
}

/// Package edits that remove the calculation chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PackageEdits {
    pub dropped: Vec<String>,
    pub rewritten: HashMap<String, String>,
}

impl PackageEdits {
    pub fn drops(&self, part: &str) -> bool {
        self.dropped.iter().any(|p| p == part)
    }

    pub fn replacement(&self, part: &str) -> Option<&str> {
        self.rewritten.get(part).map(String::as_str)
    }
}

/// Workbook part path plus where its relationships live
struct WorkbookPart {
    path: String,
    base_dir: String,
    rels_path: String,
}

fn workbook_part(archive: &mut PackageArchive<'_>) -> Result<WorkbookPart> {
    let path = match read_entry(archive, PACKAGE_RELS) {
        Ok(rels) => relationships(&rels)?
            .into_iter()
            .find(|rel| rel.kind.ends_with(OFFICE_DOCUMENT_REL))
            .map(|rel| resolve_target("", &rel.target))
            .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()),
        Err(_) => DEFAULT_WORKBOOK_PART.to_string(),
    };

    let (base_dir, file_name) = match path.rsplit_once('/') {
        Some((dir, file)) => (format!("{dir}/"), file.to_string()),
        None => (String::new(), path.clone()),
    };
    let rels_path = format!("{base_dir}_rels/{file_name}.rels");

    Ok(WorkbookPart {
        path,
        base_dir,
        rels_path,
    })
}

/// Resolve the workbook's active tab, or its first sheet when none is marked
pub(crate) fn active_sheet(archive: &mut PackageArchive<'_>) -> Result<ActiveSheet> {
    let workbook = workbook_part(archive)?;
    let workbook_xml = read_entry(archive, &workbook.path)?;
    let rels_xml = read_entry(archive, &workbook.rels_path)?;

    let (sheets, active_tab) = workbook_sheets(&workbook_xml)?;
    let targets: HashMap<String, String> = relationships(&rels_xml)?
        .into_iter()
        .map(|rel| (rel.id, rel.target))
        .collect();

    let sheet = sheets
        .get(active_tab)
        .or_else(|| sheets.first())
        .ok_or_else(|| StamperError::template("workbook declares no worksheets"))?;
    let target = targets.get(&sheet.rid).ok_or_else(|| {
        StamperError::template(format!("worksheet relationship {} has no target", sheet.rid))
    })?;

    Ok(ActiveSheet {
        name: sheet.name.clone(),
        part: resolve_target(&workbook.base_dir, target),
    })
}

/// Edits that remove the calculation chain, if the package has one
///
/// The chain part is dropped, and its workbook relationship and
/// content-type override are filtered out of their parts.
pub(crate) fn calc_chain_removal(archive: &mut PackageArchive<'_>) -> Result<PackageEdits> {
    let workbook = workbook_part(archive)?;
    let rels_xml = read_entry(archive, &workbook.rels_path)?;

    let Some(rel) = relationships(&rels_xml)?
        .into_iter()
        .find(|rel| rel.kind.ends_with(CALC_CHAIN_REL))
    else {
        return Ok(PackageEdits::default());
    };

    let part = resolve_target(&workbook.base_dir, &rel.target);
    let part_name = format!("/{part}");

    let rels = remove_elements(&rels_xml, b"Relationship", |attrs| {
        attrs.get("Id") == Some(&rel.id)
    })?;
    let content_types_xml = read_entry(archive, CONTENT_TYPES)?;
    let content_types = remove_elements(&content_types_xml, b"Override", |attrs| {
        attrs.get("PartName") == Some(&part_name)
    })?;

    let mut rewritten = HashMap::new();
    rewritten.insert(workbook.rels_path, rels);
    rewritten.insert(CONTENT_TYPES.to_string(), content_types);

    Ok(PackageEdits {
        dropped: vec![part],
        rewritten,
    })
}

pub(crate) fn read_entry(archive: &mut PackageArchive<'_>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| StamperError::template(format!("missing package part {name}: {e}")))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| StamperError::template(format!("unreadable package part {name}: {e}")))?;
    Ok(content)
}

/// Join a relationship target onto its source directory, resolving `..`
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base_dir}{target}"),
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(package_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let attrs = attributes(&e)?;
                if let (Some(id), Some(target)) = (attrs.get("Id"), attrs.get("Target")) {
                    rels.push(Relationship {
                        id: id.clone(),
                        kind: attrs.get("Type").cloned().unwrap_or_default(),
                        target: target.clone(),
                    });
                }
            }
            Event::Eof => return Ok(rels),
            _ => {}
        }
    }
}

struct SheetEntry {
    name: String,
    rid: String,
}

/// Sheets in tab order, and the active tab index
fn workbook_sheets(xml: &str) -> Result<(Vec<SheetEntry>, usize)> {
    let mut sheets = Vec::new();
    let mut active_tab = 0usize;
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(package_error)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let attrs = attributes(&e)?;
                    // The relationship id is namespaced (usually `r:id`)
                    let rid = attrs
                        .iter()
                        .find(|(key, _)| key.as_str() == "id" || key.ends_with(":id"))
                        .map(|(_, rid)| rid.clone());
                    if let Some(rid) = rid {
                        sheets.push(SheetEntry {
                            name: attrs.get("name").cloned().unwrap_or_default(),
                            rid,
                        });
                    }
                }
                b"workbookView" => {
                    if let Some(tab) = attributes(&e)?.get("activeTab") {
                        active_tab = tab.trim().parse().unwrap_or(0);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((sheets, active_tab))
}

/// Copy `xml`, leaving out every `local_name` element matched by `remove`
fn remove_elements(
    xml: &str,
    local_name: &[u8],
    remove: impl Fn(&HashMap<String, String>) -> bool,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(package_error)?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        let matched = match &event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == local_name => {
                remove(&attributes(e)?)
            }
            _ => false,
        };
        match event {
            Event::Start(_) if matched => skip_depth = 1,
            Event::Empty(_) if matched => {}
            Event::Eof => break,
            other => writer.write_event(other).map_err(package_error)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| StamperError::template(format!("rewritten package part is not UTF-8: {e}")))
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(package_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(package_error)?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn package_error(err: impl std::fmt::Display) -> StamperError {
    StamperError::template(format!("malformed workbook XML: {err}"))
}
