//! End-to-end tests with real xlsx workbooks
//!
//! Trip logs and templates are produced with rust_xlsxwriter, stamped, and
//! the delivered workbooks are read back with calamine.

use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;
use payroll_stamper::processor::delivery::{render_outputs, write_archive, write_outputs};
use payroll_stamper::{BatchProcessor, CellRef, StamperConfig, StamperError};
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

/// Trip log with a title row, header row 2, and `rows` below
fn write_trip_log(path: &Path, header: &[&str], rows: &[(&str, &str, &str, f64)]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Trips for week").unwrap();

    for (col, name) in header.iter().enumerate() {
        worksheet.write_string(1, col as u16, *name).unwrap();
    }

    let position = |name: &str| header.iter().position(|h| *h == name).map(|c| c as u16);
    for (i, (driver, trip, facility, cost)) in rows.iter().enumerate() {
        let row = i as u32 + 2;
        if let Some(col) = position("Driver Name") {
            worksheet.write_string(row, col, *driver).unwrap();
        }
        if let Some(col) = position("Trip ID") {
            worksheet.write_string(row, col, *trip).unwrap();
        }
        if let Some(col) = position("Facility Sequence") {
            worksheet.write_string(row, col, *facility).unwrap();
        }
        if let Some(col) = position("Estimated Cost") {
            worksheet.write_number(row, col, *cost).unwrap();
        }
    }

    workbook.save(path).unwrap();
}

/// Payroll template: labels in columns A and C, a styled placeholder at B16
fn write_template(path: &Path) {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Instructions").unwrap();

    let payroll = workbook.add_worksheet();
    payroll.set_name("Payroll").unwrap();
    payroll.set_active(true);
    payroll.write_string(2, 2, "Date:").unwrap();
    payroll.write_string(3, 2, "Driver:").unwrap();
    payroll.write_string(5, 2, "Period start:").unwrap();
    payroll.write_string(6, 2, "Period end:").unwrap();
    payroll.write_string(10, 0, "Trip").unwrap();
    payroll.write_string(12, 0, "Facility").unwrap();
    payroll.write_string(13, 0, "Cost").unwrap();
    payroll
        .write_string_with_format(15, 1, "placeholder", &bold)
        .unwrap();

    workbook.save(path).unwrap();
}

const HEADER: [&str; 4] = [
    "Driver Name",
    "Trip ID",
    "Facility Sequence",
    "Estimated Cost",
];

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    template: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(header: &[&str], rows: &[(&str, &str, &str, f64)]) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("trips.xlsx");
        let template = dir.path().join("template.xlsx");
        let output = dir.path().join("output_files");
        write_trip_log(&input, header, rows);
        write_template(&template);
        Self {
            _dir: dir,
            input,
            template,
            output,
        }
    }
}

fn processor() -> BatchProcessor {
    BatchProcessor::new(StamperConfig::default())
        .unwrap()
        .with_run_date(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap())
}

fn payroll_sheet(path: &Path) -> Range<Data> {
    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    workbook.worksheet_range("Payroll").unwrap()
}

fn value(range: &Range<Data>, a1: &str) -> Data {
    let cell: CellRef = a1.parse().unwrap();
    range
        .get_value((cell.row - 1, cell.col - 1))
        .cloned()
        .unwrap_or(Data::Empty)
}

fn text(s: &str) -> Data {
    Data::String(s.to_string())
}

#[test]
fn test_two_driver_example_end_to_end() {
    let fixture = Fixture::new(
        &HEADER,
        &[
            ("A", "T1", "F1", 10.0),
            ("A", "T2", "F2", 20.0),
            ("B", "T3", "F3", 30.0),
        ],
    );

    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    let outputs = render_outputs(&batch).unwrap();
    let written = write_outputs(&outputs, &fixture.output).unwrap();
    assert_eq!(written.len(), 2);

    let a = payroll_sheet(&fixture.output.join("A.xlsx"));
    assert_eq!(value(&a, "D4"), text("A"));
    assert_eq!(value(&a, "B11"), text("T1"));
    assert_eq!(value(&a, "B13"), text("F1"));
    assert_eq!(value(&a, "B14"), Data::Float(10.0));
    assert_eq!(value(&a, "B16"), text("T2"));
    assert_eq!(value(&a, "B18"), text("F2"));
    assert_eq!(value(&a, "B19"), Data::Float(20.0));
    assert_eq!(value(&a, "C4"), text("Driver:"));
    assert_eq!(value(&a, "A11"), text("Trip"));

    let b = payroll_sheet(&fixture.output.join("B.xlsx"));
    assert_eq!(value(&b, "D4"), text("B"));
    assert_eq!(value(&b, "B11"), text("T3"));
    assert_eq!(value(&b, "B13"), text("F3"));
    assert_eq!(value(&b, "B14"), Data::Float(30.0));
    // Untouched template content stays
    assert_eq!(value(&b, "B16"), text("placeholder"));
}

#[test]
fn test_pay_period_dates_are_stamped() {
    let fixture = Fixture::new(&HEADER, &[("A", "T1", "F1", 10.0)]);
    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    write_outputs(&render_outputs(&batch).unwrap(), &fixture.output).unwrap();

    let a = payroll_sheet(&fixture.output.join("A.xlsx"));
    assert_eq!(value(&a, "D3"), text("03/13/2024"));
    assert_eq!(value(&a, "D6"), text("03/10/2024"));
    assert_eq!(value(&a, "D7"), text("03/16/2024"));
}

#[test]
fn test_only_active_sheet_is_modified() {
    let fixture = Fixture::new(&HEADER, &[("A", "T1", "F1", 10.0), ("A", "T2", "F2", 2.0)]);
    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    write_outputs(&render_outputs(&batch).unwrap(), &fixture.output).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(fixture.output.join("A.xlsx")).unwrap();
    let notes = workbook.worksheet_range("Notes").unwrap();
    assert_eq!(value(&notes, "A1"), text("Instructions"));
    assert_eq!(value(&notes, "D4"), Data::Empty);
}

#[test]
fn test_replaced_cells_keep_template_style() {
    let fixture = Fixture::new(&HEADER, &[("A", "T1", "F1", 10.0), ("A", "T2", "F2", 2.0)]);
    let template_sheet = sheet_part(&fs::read(&fixture.template).unwrap(), "xl/worksheets/sheet2.xml");
    let style = style_of(&template_sheet, "B16").expect("placeholder is styled");

    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    let outputs = render_outputs(&batch).unwrap();
    let sheet = sheet_part(&outputs[0].bytes, "xl/worksheets/sheet2.xml");

    assert_eq!(style_of(&sheet, "B16"), Some(style));
    assert_eq!(value(&payroll_sheet_from(&outputs[0].bytes), "B16"), text("T2"));
}

#[test]
fn test_columns_resolved_by_header_name() {
    let shuffled = [
        "Estimated Cost",
        "Notes",
        "Trip ID",
        "Facility Sequence",
        "Driver Name",
    ];
    let fixture = Fixture::new(&shuffled, &[("Ann", "T9", "F9", 12.5)]);
    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    write_outputs(&render_outputs(&batch).unwrap(), &fixture.output).unwrap();

    let ann = payroll_sheet(&fixture.output.join("Ann.xlsx"));
    assert_eq!(value(&ann, "D4"), text("Ann"));
    assert_eq!(value(&ann, "B11"), text("T9"));
    assert_eq!(value(&ann, "B13"), text("F9"));
    assert_eq!(value(&ann, "B14"), Data::Float(12.5));
}

#[test]
fn test_missing_column_fails_before_output() {
    let fixture = Fixture::new(
        &["Driver Name", "Trip ID", "Estimated Cost"],
        &[("A", "T1", "", 1.0)],
    );
    let err = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap_err();

    match err {
        StamperError::Schema { missing, .. } => {
            assert_eq!(missing, vec!["Facility Sequence".to_string()])
        }
        other => panic!("Expected Schema error, got {:?}", other),
    }
    assert!(!fixture.output.exists());
}

#[test]
fn test_trip_log_is_read_from_its_active_tab() {
    let fixture = Fixture::new(&HEADER, &[]);
    let mut workbook = Workbook::new();
    let readme = workbook.add_worksheet();
    readme.set_name("Readme").unwrap();
    readme.write_string(1, 0, "Export of the dispatch board").unwrap();
    let trips = workbook.add_worksheet();
    trips.set_name("Trips").unwrap();
    trips.set_active(true);
    for (col, name) in HEADER.iter().enumerate() {
        trips.write_string(1, col as u16, *name).unwrap();
    }
    trips.write_string(2, 0, "Ann").unwrap();
    trips.write_string(2, 1, "T1").unwrap();
    trips.write_string(2, 2, "F1").unwrap();
    trips.write_number(2, 3, 42.0).unwrap();
    workbook.save(&fixture.input).unwrap();

    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    write_outputs(&render_outputs(&batch).unwrap(), &fixture.output).unwrap();

    let ann = payroll_sheet(&fixture.output.join("Ann.xlsx"));
    assert_eq!(value(&ann, "D4"), text("Ann"));
    assert_eq!(value(&ann, "B11"), text("T1"));
    assert_eq!(value(&ann, "B14"), Data::Float(42.0));
}

#[test]
fn test_archive_contains_readable_workbooks() {
    let fixture = Fixture::new(&HEADER, &[("A", "T1", "F1", 1.0), ("B", "T2", "F2", 2.0)]);
    let batch = processor()
        .run_files(&fixture.input, &fixture.template)
        .unwrap();
    let archive_path = fixture.output.join("payroll.zip");
    write_archive(&render_outputs(&batch).unwrap(), &archive_path).unwrap();

    let mut archive = ZipArchive::new(fs::File::open(&archive_path).unwrap()).unwrap();
    let mut bytes = Vec::new();
    archive
        .by_name("B.xlsx")
        .unwrap()
        .read_to_end(&mut bytes)
        .unwrap();
    assert_eq!(value(&payroll_sheet_from(&bytes), "B11"), text("T2"));
}

fn payroll_sheet_from(bytes: &[u8]) -> Range<Data> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
    workbook.worksheet_range("Payroll").unwrap()
}

fn sheet_part(bytes: &[u8], part: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name(part)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}

/// Value of the `s` attribute on the `<c>` element for `a1`
fn style_of(sheet_xml: &str, a1: &str) -> Option<String> {
    let start = sheet_xml.find(&format!(r#"<c r="{a1}""#))?;
    let element = &sheet_xml[start..start + sheet_xml[start..].find('>')?];
    let s = element.find(r#" s=""#)? + 4;
    let end = element[s..].find('"')?;
    Some(element[s..s + end].to_string())
}
