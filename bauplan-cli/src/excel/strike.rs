//! Cell-level strikethrough detection
//!
//! Crossing registers mark obsolete rows by striking the clearance cell
//! out rather than deleting the row, so the exclusion signal lives in
//! formatting, not in cell text. Calamine only surfaces values, so this
//! module opens the workbook as the zip archive it is and walks the
//! OOXML parts directly: `xl/styles.xml` maps cell-format indices to
//! fonts, the sheet part carries the per-cell format index.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

/// Collect the 1-based sheet row numbers whose cell in `column_index`
/// (0-based) carries strikethrough font formatting.
///
/// Workbooks without a styles part yield an empty set.
pub fn struck_rows(path: &Path, sheet_name: &str, column_index: usize) -> Result<BTreeSet<u32>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Not a valid xlsx archive: {}", path.display()))?;

    let Some(styles_xml) = read_member(&mut archive, "xl/styles.xml")? else {
        log::debug!("{} has no styles part, nothing is struck", path.display());
        return Ok(BTreeSet::new());
    };
    let styles = parse_styles(&styles_xml)?;
    if !styles.any_struck() {
        return Ok(BTreeSet::new());
    }

    let workbook_xml = read_member(&mut archive, "xl/workbook.xml")?
        .context("Workbook is missing xl/workbook.xml")?;
    let rels_xml = read_member(&mut archive, "xl/_rels/workbook.xml.rels")?
        .context("Workbook is missing xl/_rels/workbook.xml.rels")?;
    let sheet_part = sheet_part_path(&workbook_xml, &rels_xml, sheet_name)?;

    let sheet_xml = read_member(&mut archive, &sheet_part)?
        .with_context(|| format!("Workbook is missing sheet part {}", sheet_part))?;

    scan_sheet(&sheet_xml, column_index, &styles)
}

fn read_member<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut member) => {
            let mut content = String::new();
            member
                .read_to_string(&mut content)
                .with_context(|| format!("Failed to read archive member {}", name))?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to open archive member {}", name)),
    }
}

/// Strikethrough flags per font, and font references per cell format
struct StyleTable {
    struck_fonts: Vec<bool>,
    xf_fonts: Vec<usize>,
}

impl StyleTable {
    fn any_struck(&self) -> bool {
        self.struck_fonts.iter().any(|&s| s)
    }

    /// Is the cell format at `xf_index` backed by a struck font?
    fn is_struck(&self, xf_index: usize) -> bool {
        self.xf_fonts
            .get(xf_index)
            .and_then(|&font| self.struck_fonts.get(font))
            .copied()
            .unwrap_or(false)
    }
}

/// Parse `xl/styles.xml` for fonts and the cellXfs font references.
///
/// Only `<font>` elements inside `<fonts>` count; `<dxfs>` carries font
/// definitions of its own that cell formats never reference.
fn parse_styles(xml: &str) -> Result<StyleTable> {
    let mut reader = Reader::from_str(xml);
    let mut struck_fonts: Vec<bool> = Vec::new();
    let mut xf_fonts: Vec<usize> = Vec::new();
    let mut in_fonts = false;
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match local_name(&e) {
                b"fonts" => in_fonts = true,
                b"cellXfs" => in_cell_xfs = true,
                b"font" if in_fonts => struck_fonts.push(false),
                b"strike" if in_fonts => {
                    if strike_enabled(&e)? {
                        if let Some(last) = struck_fonts.last_mut() {
                            *last = true;
                        }
                    }
                }
                b"xf" if in_cell_xfs => {
                    let font_id = attribute(&e, b"fontId")?
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    xf_fonts.push(font_id);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(StyleTable {
        struck_fonts,
        xf_fonts,
    })
}

/// `<strike/>` is on unless its val attribute says otherwise
fn strike_enabled(e: &BytesStart) -> Result<bool> {
    Ok(match attribute(e, b"val")? {
        Some(val) => !matches!(val.as_str(), "0" | "false"),
        None => true,
    })
}

/// Resolve a sheet name to its part path inside the archive
fn sheet_part_path(workbook_xml: &str, rels_xml: &str, sheet_name: &str) -> Result<String> {
    // workbook.xml: sheet name -> relationship id
    let mut reader = Reader::from_str(workbook_xml);
    let mut rel_id: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if local_name(&e) == b"sheet" => {
                let name = attribute(&e, b"name")?;
                if name.as_deref() == Some(sheet_name) {
                    rel_id = attribute(&e, b"r:id")?;
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let Some(rel_id) = rel_id else {
        bail!("Sheet '{}' not found in workbook", sheet_name);
    };

    // workbook.xml.rels: relationship id -> part target
    let mut reader = Reader::from_str(rels_xml);
    let mut targets: HashMap<String, String> = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if local_name(&e) == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let target = targets
        .get(&rel_id)
        .with_context(|| format!("No relationship target for sheet '{}'", sheet_name))?;

    // Targets are relative to xl/ unless they are archive-absolute
    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    })
}

/// Walk the sheet part and collect struck rows in the target column
fn scan_sheet(sheet_xml: &str, column_index: usize, styles: &StyleTable) -> Result<BTreeSet<u32>> {
    let mut reader = Reader::from_str(sheet_xml);
    let mut rows = BTreeSet::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if local_name(&e) == b"c" => {
                let Some(cell_ref) = attribute(&e, b"r")? else {
                    continue;
                };
                let Some((col, row)) = parse_cell_ref(&cell_ref) else {
                    continue;
                };
                if col != column_index {
                    continue;
                }
                let Some(style) = attribute(&e, b"s")?.and_then(|v| v.parse::<usize>().ok())
                else {
                    continue;
                };
                if styles.is_struck(style) {
                    rows.insert(row);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

fn local_name<'a>(e: &'a BytesStart) -> &'a [u8] {
    e.local_name().into_inner()
}

fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    // All XML parts here come from Reader::from_str, so the decoder is UTF-8;
    // unescape_value is unavailable because a dependency enables quick-xml's
    // encoding feature.
    let decoder = Reader::from_str("").decoder();
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.decode_and_unescape_value(decoder)?.into_owned()));
        }
    }
    Ok(None)
}

/// Split an A1-style reference into 0-based column and 1-based row
fn parse_cell_ref(cell_ref: &str) -> Option<(usize, u32)> {
    let split = cell_ref.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell_ref.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (c as usize - 'A' as usize + 1);
    }
    let row: u32 = digits.parse().ok()?;
    Some((col - 1, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Format, Workbook};
    use tempfile::tempdir;

    #[test]
    fn cell_refs_parse_to_column_and_row() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 1)));
        assert_eq!(parse_cell_ref("B3"), Some((1, 3)));
        assert_eq!(parse_cell_ref("AA10"), Some((26, 10)));
        assert_eq!(parse_cell_ref("7"), None);
        assert_eq!(parse_cell_ref("b3"), None);
    }

    #[test]
    fn detects_struck_cells_in_target_column_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("register.xlsx");

        let strike = Format::new().set_font_strikethrough();
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("Kreuzungen").unwrap();
        ws.write_string(0, 1, "Kreuzung hergestellt").unwrap();
        ws.write_string(1, 1, "nein").unwrap();
        ws.write_string_with_format(2, 1, "Nein, siehe Anlage", &strike)
            .unwrap();
        // struck cell outside the target column must not count
        ws.write_string_with_format(3, 0, "obsolete", &strike).unwrap();
        ws.write_string(3, 1, "nein").unwrap();
        workbook.save(&path).unwrap();

        let rows = struck_rows(&path, "Kreuzungen", 1).unwrap();
        assert_eq!(rows, BTreeSet::from([3]));
    }

    #[test]
    fn workbook_without_strikes_yields_empty_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("Kreuzungen").unwrap();
        ws.write_string(0, 0, "ID").unwrap();
        ws.write_string(1, 0, "1").unwrap();
        workbook.save(&path).unwrap();

        assert!(struck_rows(&path, "Kreuzungen", 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("register.xlsx");

        let strike = Format::new().set_font_strikethrough();
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string_with_format(0, 0, "x", &strike).unwrap();
        workbook.save(&path).unwrap();

        assert!(struck_rows(&path, "Fehlt", 0).is_err());
    }
}
