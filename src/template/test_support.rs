//! In-memory xlsx packages for unit tests.

use super::Template;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Builds a minimal but well-formed xlsx package
pub(crate) struct TemplateBuilder {
    sheets: Vec<(String, String)>,
    active_tab: Option<usize>,
    calc_chain: bool,
}

impl TemplateBuilder {
    pub(crate) fn new() -> Self {
        Self {
            sheets: Vec::new(),
            active_tab: None,
            calc_chain: false,
        }
    }

    /// Add a worksheet whose `<sheetData>` holds `rows_xml`
    pub(crate) fn sheet(mut self, name: &str, rows_xml: &str) -> Self {
        self.sheets.push((name.to_string(), rows_xml.to_string()));
        self
    }

    pub(crate) fn active_tab(mut self, tab: usize) -> Self {
        self.active_tab = Some(tab);
        self
    }

    /// Add `xl/calcChain.xml` listing B14 of the first sheet
    pub(crate) fn with_calc_chain(mut self) -> Self {
        self.calc_chain = true;
        self
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();

        let mut content_types = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        ));
        for i in 1..=self.sheets.len() {
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        if self.calc_chain {
            content_types.push_str(
                r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#,
            );
        }
        content_types.push_str("</Types>");

        let package_rels = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
            r#"</Relationships>"#
        );

        let mut workbook = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        ));
        if let Some(tab) = self.active_tab {
            workbook.push_str(&format!(
                r#"<bookViews><workbookView activeTab="{tab}"/></bookViews>"#
            ));
        }
        workbook.push_str("<sheets>");
        for (i, (name, _)) in self.sheets.iter().enumerate() {
            let n = i + 1;
            workbook.push_str(&format!(
                r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#
            ));
        }
        workbook.push_str("</sheets></workbook>");

        let mut workbook_rels = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            workbook_rels.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            ));
        }
        if self.calc_chain {
            let n = self.sheets.len() + 1;
            workbook_rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/>"#
            ));
        }
        workbook_rels.push_str("</Relationships>");

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types),
            ("_rels/.rels".to_string(), package_rels.to_string()),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels),
        ];
        for (i, (_, rows)) in self.sheets.iter().enumerate() {
            parts.push((
                format!("xl/worksheets/sheet{}.xml", i + 1),
                format!(
                    concat!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
                        r#"<sheetData>{}</sheetData></worksheet>"#
                    ),
                    rows
                ),
            ));
        }

        if self.calc_chain {
            parts.push((
                "xl/calcChain.xml".to_string(),
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                    r#"<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
                    r#"<c r="B14" i="1"/></calcChain>"#
                )
                .to_string(),
            ));
        }

        for (name, content) in parts {
            zip.start_file(name, opts).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub(crate) fn build(&self) -> Template {
        Template::from_bytes("template.xlsx", self.bytes()).unwrap()
    }
}

/// The payroll template used across tests: labels in column A/C, no values
pub(crate) fn payroll_template() -> Template {
    TemplateBuilder::new()
        .sheet(
            "Payroll",
            concat!(
                r#"<row r="4"><c r="C4" t="inlineStr"><is><t>Driver:</t></is></c></row>"#,
                r#"<row r="11"><c r="A11" t="inlineStr"><is><t>Trip</t></is></c></row>"#,
                r#"<row r="13"><c r="A13" t="inlineStr"><is><t>Facility</t></is></c></row>"#,
                r#"<row r="14"><c r="A14" t="inlineStr"><is><t>Cost</t></is></c></row>"#,
            ),
        )
        .build()
}

/// Names of every part in a serialized package
pub(crate) fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Read one part of a serialized package as text
pub(crate) fn sheet_xml_in(bytes: &[u8], part: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name(part)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}
