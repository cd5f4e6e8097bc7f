//! Worksheet XML patching.
//!
//! Streams a `sheetN.xml` part through quick-xml and sets cell values in
//! place: existing cells keep their style index, missing cells and rows are
//! inserted in row-major order, and the `<dimension>` range is widened to
//! cover every written cell. Everything else passes through untouched.

use super::cell_ref::CellRef;
use crate::error::{Result, StamperError};
use crate::models::{CellValue, format_number};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

/// Column index -> value, for one row
type RowWrites = BTreeMap<u32, CellValue>;

/// Apply `cells` to a worksheet XML document
pub fn patch_sheet_xml(xml: &str, cells: &BTreeMap<CellRef, CellValue>) -> Result<String> {
    if cells.is_empty() {
        return Ok(xml.to_string());
    }

    let mut pending: BTreeMap<u32, RowWrites> = BTreeMap::new();
    for (cell, value) in cells {
        pending
            .entry(cell.row)
            .or_default()
            .insert(cell.col, value.clone());
    }

    let mut patcher = SheetPatcher {
        writer: Writer::new(Vec::with_capacity(xml.len() + cells.len() * 64)),
        pending,
        bounds: Bounds::covering(cells.keys()),
        in_sheet_data: false,
        saw_sheet_data: false,
        current_row: None,
        last_row: 0,
        last_col: 0,
        skip_depth: 0,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        if matches!(event, Event::Eof) {
            break;
        }
        patcher.handle(event)?;
    }

    if !patcher.saw_sheet_data {
        return Err(StamperError::template("worksheet has no <sheetData> element"));
    }

    String::from_utf8(patcher.writer.into_inner())
        .map_err(|e| StamperError::template(format!("patched worksheet is not UTF-8: {e}")))
}

/// Worksheet elements the patcher reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    SheetData,
    Row,
    Cell,
    Dimension,
    Other,
}

impl Tag {
    fn from_local_name(name: &[u8]) -> Self {
        match name {
            b"sheetData" => Tag::SheetData,
            b"row" => Tag::Row,
            b"c" => Tag::Cell,
            b"dimension" => Tag::Dimension,
            _ => Tag::Other,
        }
    }

    fn of(e: &BytesStart<'_>) -> Self {
        Self::from_local_name(e.local_name().as_ref())
    }

    fn of_end(e: &BytesEnd<'_>) -> Self {
        Self::from_local_name(e.local_name().as_ref())
    }
}

struct SheetPatcher {
    writer: Writer<Vec<u8>>,
    pending: BTreeMap<u32, RowWrites>,
    bounds: Bounds,
    in_sheet_data: bool,
    saw_sheet_data: bool,
    /// Writes still owed to the row currently open in the source
    current_row: Option<RowWrites>,
    last_row: u32,
    last_col: u32,
    /// Depth inside an original `<c>` being replaced
    skip_depth: usize,
}

impl SheetPatcher {
    fn handle(&mut self, event: Event<'_>) -> Result<()> {
        if self.skip_depth > 0 {
            match event {
                Event::Start(_) => self.skip_depth += 1,
                Event::End(_) => self.skip_depth -= 1,
                _ => {}
            }
            return Ok(());
        }

        match event {
            Event::Start(e) => match Tag::of(&e) {
                Tag::SheetData => {
                    self.in_sheet_data = true;
                    self.saw_sheet_data = true;
                    self.emit(Event::Start(e))
                }
                Tag::Row if self.in_sheet_data && self.current_row.is_none() => self.open_row(e),
                Tag::Cell if self.current_row.is_some() => self.cell(e, true),
                Tag::Dimension => {
                    let widened = self.widen_dimension(&e)?;
                    self.emit(Event::Start(widened))
                }
                _ => self.emit(Event::Start(e)),
            },
            Event::Empty(e) => match Tag::of(&e) {
                Tag::SheetData => {
                    self.saw_sheet_data = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.emit(Event::Start(e))?;
                    self.flush_rows_before(None)?;
                    self.emit(Event::End(BytesEnd::new(name)))
                }
                Tag::Row if self.in_sheet_data && self.current_row.is_none() => self.empty_row(e),
                Tag::Cell if self.current_row.is_some() => self.cell(e, false),
                Tag::Dimension => {
                    let widened = self.widen_dimension(&e)?;
                    self.emit(Event::Empty(widened))
                }
                _ => self.emit(Event::Empty(e)),
            },
            Event::End(e) => match Tag::of_end(&e) {
                Tag::Row if self.current_row.is_some() => {
                    if let Some(writes) = self.current_row.take() {
                        self.write_cells(self.last_row, writes)?;
                    }
                    self.emit(Event::End(e))
                }
                Tag::SheetData if self.in_sheet_data => {
                    self.flush_rows_before(None)?;
                    self.in_sheet_data = false;
                    self.emit(Event::End(e))
                }
                _ => self.emit(Event::End(e)),
            },
            other => self.emit(other),
        }
    }

    fn open_row(&mut self, e: BytesStart<'_>) -> Result<()> {
        let row = self.row_number(&e)?;
        self.flush_rows_before(Some(row))?;
        match self.pending.remove(&row) {
            Some(writes) => {
                self.emit(Event::Start(without_spans(&e)?))?;
                self.current_row = Some(writes);
            }
            None => {
                self.emit(Event::Start(e))?;
                self.current_row = Some(RowWrites::new());
            }
        }
        Ok(())
    }

    fn empty_row(&mut self, e: BytesStart<'_>) -> Result<()> {
        let row = self.row_number(&e)?;
        self.flush_rows_before(Some(row))?;
        match self.pending.remove(&row) {
            Some(writes) => {
                let start = without_spans(&e)?;
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                self.emit(Event::Start(start))?;
                self.write_cells(row, writes)?;
                self.emit(Event::End(BytesEnd::new(name)))
            }
            None => self.emit(Event::Empty(e)),
        }
    }

    fn cell(&mut self, e: BytesStart<'_>, has_body: bool) -> Result<()> {
        let col = match attribute(&e, b"r")? {
            Some(reference) => reference.parse::<CellRef>()?.col,
            None => self.last_col + 1,
        };
        self.last_col = col;

        let row = self.last_row;
        let Some(writes) = self.current_row.as_mut() else {
            return self.emit(if has_body { Event::Start(e) } else { Event::Empty(e) });
        };
        let later = writes.split_off(&col);
        let earlier = std::mem::replace(writes, later);
        let replacement = writes.remove(&col);
        self.write_cells(row, earlier)?;

        match replacement {
            Some(value) => {
                let style = attribute(&e, b"s")?;
                write_cell(&mut self.writer, CellRef::new(row, col)?, style.as_deref(), &value)?;
                if has_body {
                    self.skip_depth = 1;
                }
                Ok(())
            }
            None => self.emit(if has_body { Event::Start(e) } else { Event::Empty(e) }),
        }
    }

    fn row_number(&mut self, e: &BytesStart<'_>) -> Result<u32> {
        let row = match attribute(e, b"r")? {
            Some(r) => r
                .trim()
                .parse::<u32>()
                .map_err(|_| StamperError::template(format!("invalid row number '{}'", r)))?,
            None => self.last_row + 1,
        };
        self.last_row = row;
        self.last_col = 0;
        Ok(row)
    }

    /// Emit every pending row numbered below `limit`, or all of them
    fn flush_rows_before(&mut self, limit: Option<u32>) -> Result<()> {
        let flushed = match limit {
            Some(row) => {
                let later = self.pending.split_off(&row);
                std::mem::replace(&mut self.pending, later)
            }
            None => std::mem::take(&mut self.pending),
        };
        for (row, writes) in flushed {
            let mut start = BytesStart::new("row");
            let row_attr = row.to_string();
            start.push_attribute(("r", row_attr.as_str()));
            self.emit(Event::Start(start))?;
            self.write_cells(row, writes)?;
            self.emit(Event::End(BytesEnd::new("row")))?;
        }
        Ok(())
    }

    fn write_cells(&mut self, row: u32, writes: RowWrites) -> Result<()> {
        for (col, value) in writes {
            write_cell(&mut self.writer, CellRef::new(row, col)?, None, &value)?;
        }
        Ok(())
    }

    fn widen_dimension(&self, e: &BytesStart<'_>) -> Result<BytesStart<'static>> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut widened = BytesStart::new(name);
        for attr in e.attributes() {
            let attr = attr.map_err(xml_error)?;
            if attr.key.as_ref() == b"ref" {
                let current = attr.unescape_value().map_err(xml_error)?;
                let merged = match Bounds::parse(&current) {
                    Some(existing) => existing.union(&self.bounds),
                    None => self.bounds.clone(),
                };
                let range = merged.to_string();
                widened.push_attribute(("ref", range.as_str()));
            } else {
                widened.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
            }
        }
        Ok(widened)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        put(&mut self.writer, event)
    }
}

fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    cell: CellRef,
    style: Option<&str>,
    value: &CellValue,
) -> Result<()> {
    let reference = cell.to_string();
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }

    match value {
        CellValue::Empty => put(writer, Event::Empty(start)),
        CellValue::Text(text) => write_inline_string(writer, start, text),
        CellValue::Number(n) | CellValue::DateTime(n) if n.is_finite() => {
            write_value(writer, start, &format_number(*n))
        }
        CellValue::Number(n) | CellValue::DateTime(n) => {
            write_inline_string(writer, start, &n.to_string())
        }
        CellValue::Bool(b) => {
            start.push_attribute(("t", "b"));
            write_value(writer, start, if *b { "1" } else { "0" })
        }
    }
}

fn write_value(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>, raw: &str) -> Result<()> {
    put(writer, Event::Start(start))?;
    put(writer, Event::Start(BytesStart::new("v")))?;
    put(writer, Event::Text(BytesText::new(raw)))?;
    put(writer, Event::End(BytesEnd::new("v")))?;
    put(writer, Event::End(BytesEnd::new("c")))
}

fn write_inline_string(
    writer: &mut Writer<Vec<u8>>,
    mut start: BytesStart<'_>,
    text: &str,
) -> Result<()> {
    start.push_attribute(("t", "inlineStr"));
    put(writer, Event::Start(start))?;
    put(writer, Event::Start(BytesStart::new("is")))?;
    let mut t = BytesStart::new("t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.push_attribute(("xml:space", "preserve"));
    }
    put(writer, Event::Start(t))?;
    put(writer, Event::Text(BytesText::new(text)))?;
    put(writer, Event::End(BytesEnd::new("t")))?;
    put(writer, Event::End(BytesEnd::new("is")))?;
    put(writer, Event::End(BytesEnd::new("c")))
}

fn put(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(xml_error)
}

/// Copy a `<row>` start tag without its `spans` hint, which goes stale
/// once cells are inserted
fn without_spans(e: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() != b"spans" {
            out.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
        }
    }
    Ok(out)
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(err: impl std::fmt::Display) -> StamperError {
    StamperError::template(format!("malformed worksheet XML: {err}"))
}

/// Rectangular cell range
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bounds {
    first_row: u32,
    first_col: u32,
    last_row: u32,
    last_col: u32,
}

impl Bounds {
    fn covering<'a>(cells: impl Iterator<Item = &'a CellRef>) -> Self {
        let mut bounds = Bounds {
            first_row: u32::MAX,
            first_col: u32::MAX,
            last_row: 0,
            last_col: 0,
        };
        for cell in cells {
            bounds.first_row = bounds.first_row.min(cell.row);
            bounds.first_col = bounds.first_col.min(cell.col);
            bounds.last_row = bounds.last_row.max(cell.row);
            bounds.last_col = bounds.last_col.max(cell.col);
        }
        bounds
    }

    fn parse(range: &str) -> Option<Self> {
        let mut parts = range.split(':');
        let first: CellRef = parts.next()?.parse().ok()?;
        let last: CellRef = match parts.next() {
            Some(part) => part.parse().ok()?,
            None => first,
        };
        Some(Bounds {
            first_row: first.row,
            first_col: first.col,
            last_row: last.row,
            last_col: last.col,
        })
    }

    fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            first_row: self.first_row.min(other.first_row),
            first_col: self.first_col.min(other.first_col),
            last_row: self.last_row.max(other.last_row),
            last_col: self.last_col.max(other.last_col),
        }
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let first = CellRef {
            row: self.first_row,
            col: self.first_col,
        };
        let last = CellRef {
            row: self.last_row,
            col: self.last_col,
        };
        if first == last {
            write!(f, "{}", first)
        } else {
            write!(f, "{}:{}", first, last)
        }
    }
}
