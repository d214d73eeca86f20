//! Worksheet part patching
//!
//! Only the cells handed in as changed are rewritten; every other cell, row
//! attribute, column width, merged region and print setting is copied through
//! byte for byte. A rewritten cell keeps the `s` (style) attribute it had in
//! the template, so number formats and fonts survive the new value.
//!
//! Cells sharing a formula are always rewritten from the model: the model
//! holds each cell's own expanded formula, and replacing only the anchor of a
//! shared formula would orphan its dependents.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_xlsxwriter::utility::{column_name_to_number, column_number_to_name, row_col_to_cell};

use super::cell::CellValue;
use super::workbook::{ConditionalFill, Sheet};
use super::xml::{attr, insert_root_child, remove_spans, root_child_spans, with_attr};

/// Elements that follow `<conditionalFormatting>` inside `<worksheet>`
const AFTER_CONDITIONAL_FORMATTING: [&[u8]; 22] = [
    b"dataValidations",
    b"hyperlinks",
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"drawingHF",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

const WORKSHEET_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// A `<c>` element as found in the part
struct SourceCell<'a> {
    col: u16,
    style: Option<String>,
    shared: bool,
    raw: &'a [u8],
}

/// Children of a `<row>` element
#[derive(Default)]
struct SourceRow<'a> {
    cells: Vec<SourceCell<'a>>,
    other: Vec<&'a [u8]>,
}

/// Zero-based `(row, col)` of an `A1` reference
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u16)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let row = digits.parse::<u32>().ok()?.checked_sub(1)?;
    Some((row, column_name_to_number(&letters.to_ascii_uppercase())))
}

/// Smallest worksheet part the patcher can fill
pub fn blank_worksheet() -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<worksheet xmlns=\"{WORKSHEET_NAMESPACE}\"><sheetData/></worksheet>"
    )
    .into_bytes()
}

/// Rewrite the `changed` cells of a worksheet part from `sheet`
pub fn patch_cells(xml: &[u8], sheet: &Sheet, changed: &BTreeSet<(u32, u16)>) -> Result<Vec<u8>> {
    let mut pending: BTreeMap<u32, Vec<u16>> = BTreeMap::new();
    for (row, col) in changed {
        pending.entry(*row).or_default().push(*col);
    }

    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + changed.len() * 64));
    let mut in_sheet_data = false;
    let mut saw_sheet_data = false;
    let mut last_row: Option<u32> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = true;
                saw_sheet_data = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                saw_sheet_data = true;
                if pending.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    writer.write_event(Event::Start(e.clone()))?;
                    write_new_rows(&mut writer, sheet, &mut pending, None)?;
                    writer.write_event(Event::End(e.to_end()))?;
                }
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                write_new_rows(&mut writer, sheet, &mut pending, None)?;
                in_sheet_data = false;
                writer.write_event(Event::End(e))?;
            }
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let row = row_index(&e, last_row)?;
                last_row = Some(row);
                write_new_rows(&mut writer, sheet, &mut pending, Some(row))?;

                let source = read_row(&mut reader, xml, row)?;
                let cols = pending.remove(&row).unwrap_or_default();
                write_row(&mut writer, e, false, row, &source, &cols, sheet)?;
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let row = row_index(&e, last_row)?;
                last_row = Some(row);
                write_new_rows(&mut writer, sheet, &mut pending, Some(row))?;

                let cols = pending.remove(&row).unwrap_or_default();
                write_row(&mut writer, e, true, row, &SourceRow::default(), &cols, sheet)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"dimension" => {
                writer.write_event(Event::Start(expand_dimension(&e, sheet)?))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"dimension" => {
                writer.write_event(Event::Empty(expand_dimension(&e, sheet)?))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"worksheet" => {
                if !saw_sheet_data && !pending.is_empty() {
                    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
                    write_new_rows(&mut writer, sheet, &mut pending, None)?;
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}

fn row_index(start: &BytesStart, last_row: Option<u32>) -> Result<u32> {
    match attr(start, b"r")? {
        Some(r) => match r.trim().parse::<u32>().ok().and_then(|r| r.checked_sub(1)) {
            Some(row) => Ok(row),
            None => bail!("invalid row number '{}'", r),
        },
        None => Ok(last_row.map_or(0, |row| row + 1)),
    }
}

/// Collect the children of a `<row>` up to its closing tag
fn read_row<'a>(reader: &mut Reader<&'a [u8]>, xml: &'a [u8], row: u32) -> Result<SourceRow<'a>> {
    let mut source = SourceRow::default();
    let mut last_col: Option<u16> = None;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let col = cell_col(&e, row, last_col)?;
                let style = attr(&e, b"s")?;
                reader.read_to_end(e.name())?;
                let raw = &xml[start..reader.buffer_position() as usize];
                last_col = Some(col);
                source.cells.push(SourceCell {
                    col,
                    style,
                    shared: has_shared_formula(raw)?,
                    raw,
                });
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let col = cell_col(&e, row, last_col)?;
                last_col = Some(col);
                source.cells.push(SourceCell {
                    col,
                    style: attr(&e, b"s")?,
                    shared: false,
                    raw: &xml[start..reader.buffer_position() as usize],
                });
            }
            Event::Start(e) => {
                reader.read_to_end(e.name())?;
                source.other.push(&xml[start..reader.buffer_position() as usize]);
            }
            Event::Empty(_) => {
                source.other.push(&xml[start..reader.buffer_position() as usize]);
            }
            Event::End(_) => break,
            Event::Eof => bail!("unexpected end of worksheet inside row {}", row + 1),
            _ => {}
        }
    }

    Ok(source)
}

fn cell_col(start: &BytesStart, row: u32, last_col: Option<u16>) -> Result<u16> {
    match attr(start, b"r")? {
        Some(reference) => match parse_cell_ref(&reference) {
            Some((cell_row, col)) if cell_row == row => Ok(col),
            _ => bail!("cell '{}' does not belong to row {}", reference, row + 1),
        },
        None => Ok(last_col.map_or(0, |col| col + 1)),
    }
}

fn has_shared_formula(raw: &[u8]) -> Result<bool> {
    let mut reader = Reader::from_reader(raw);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"f" => {
                return Ok(attr(&e, b"t")?.as_deref() == Some("shared"));
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

fn write_row(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart,
    was_empty: bool,
    row: u32,
    source: &SourceRow,
    cols: &[u16],
    sheet: &Sheet,
) -> Result<()> {
    let rewrite = !cols.is_empty() || source.cells.iter().any(|c| c.shared);

    if !rewrite {
        if was_empty {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        let end = start.to_end().into_owned();
        writer.write_event(Event::Start(start))?;
        for cell in &source.cells {
            writer.get_mut().extend_from_slice(cell.raw);
        }
        for raw in &source.other {
            writer.get_mut().extend_from_slice(raw);
        }
        writer.write_event(Event::End(end))?;
        return Ok(());
    }

    // Cell spans would no longer describe the row
    let start = with_attr(&start, "spans", None)?;
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;

    let mut cols = cols.iter().copied().peekable();
    for cell in &source.cells {
        while let Some(col) = cols.next_if(|col| *col < cell.col) {
            write_cell(writer, row, col, sheet.get(row, col), None)?;
        }
        let changed = cols.next_if(|col| *col == cell.col).is_some();
        if changed || cell.shared {
            write_cell(writer, row, cell.col, sheet.get(row, cell.col), cell.style.as_deref())?;
        } else {
            writer.get_mut().extend_from_slice(cell.raw);
        }
    }
    for col in cols {
        write_cell(writer, row, col, sheet.get(row, col), None)?;
    }
    for raw in &source.other {
        writer.get_mut().extend_from_slice(raw);
    }

    writer.write_event(Event::End(end))?;
    Ok(())
}

/// Write pending rows that are not in the part, up to (not including) `before`
fn write_new_rows(
    writer: &mut Writer<Vec<u8>>,
    sheet: &Sheet,
    pending: &mut BTreeMap<u32, Vec<u16>>,
    before: Option<u32>,
) -> Result<()> {
    let rows: Vec<u32> = pending
        .keys()
        .copied()
        .take_while(|row| before.is_none_or(|before| *row < before))
        .collect();

    for row in rows {
        let cols = pending.remove(&row).unwrap_or_default();
        if cols.iter().all(|col| sheet.get(row, *col).is_empty()) {
            continue;
        }

        let number = (row + 1).to_string();
        writer.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", number.as_str())]),
        ))?;
        for col in cols {
            write_cell(writer, row, col, sheet.get(row, col), None)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    Ok(())
}

fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    row: u32,
    col: u16,
    value: &CellValue,
    style: Option<&str>,
) -> Result<()> {
    let reference = row_col_to_cell(row, col);
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }

    match value {
        CellValue::Number(f) | CellValue::DateTime(f) if f.is_finite() => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "v", &f.to_string())?;
        }
        CellValue::Bool(b) => {
            start.push_attribute(("t", "b"));
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "v", if *b { "1" } else { "0" })?;
        }
        CellValue::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(
                BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
            ))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
        }
        CellValue::Formula(expression) => {
            writer.write_event(Event::Start(start))?;
            let expression = expression.strip_prefix('=').unwrap_or(expression);
            write_text_element(writer, "f", expression)?;
        }
        _ => {
            // Blank: keep the formatted placeholder, drop an unformatted one
            if style.is_some() {
                writer.write_event(Event::Empty(start))?;
            }
            return Ok(());
        }
    }

    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Grow `<dimension ref>` so it covers every populated cell of the model
fn expand_dimension<'a>(start: &BytesStart<'a>, sheet: &Sheet) -> Result<BytesStart<'a>> {
    let (Some(max_row), Some(max_col)) = (sheet.max_row(), sheet.max_col()) else {
        return Ok(start.clone());
    };

    let (mut last_row, mut last_col) = (max_row, max_col);
    let mut first = "A1".to_string();
    if let Some(reference) = attr(start, b"ref")? {
        let (head, tail) = reference
            .split_once(':')
            .unwrap_or((reference.as_str(), reference.as_str()));
        if parse_cell_ref(head).is_some() {
            first = head.to_string();
        }
        if let Some((row, col)) = parse_cell_ref(tail) {
            last_row = last_row.max(row);
            last_col = last_col.max(col);
        }
    }

    let reference = format!("{}:{}", first, row_col_to_cell(last_row, last_col));
    with_attr(start, "ref", Some(&reference))
}

/// Raw `<conditionalFormatting>` elements with the dxf ids their rules use
pub fn conditional_formats(xml: &[u8]) -> Result<Vec<(String, Vec<u32>)>> {
    root_child_spans(xml, b"conditionalFormatting")?
        .into_iter()
        .map(|span| {
            let raw = &xml[span];
            let mut ids = Vec::new();
            let mut reader = Reader::from_reader(raw);
            loop {
                match reader.read_event()? {
                    Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"cfRule" => {
                        if let Some(id) = attr(&e, b"dxfId")?.and_then(|id| id.parse::<u32>().ok()) {
                            ids.push(id);
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
            Ok((std::str::from_utf8(raw)?.to_string(), ids))
        })
        .collect()
}

/// Point every rule of a raw `<conditionalFormatting>` element at new dxf ids
pub fn remap_dxf_ids(fragment: &str, ids: &BTreeMap<u32, u32>) -> Result<String> {
    let mut reader = Reader::from_reader(fragment.as_bytes());
    let mut writer = Writer::new(Vec::with_capacity(fragment.len()));

    let remap = |e: &BytesStart| -> Result<Option<String>> {
        Ok(attr(e, b"dxfId")?
            .and_then(|id| id.parse::<u32>().ok())
            .and_then(|id| ids.get(&id))
            .map(|id| id.to_string()))
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"cfRule" => match remap(&e)? {
                Some(id) => writer.write_event(Event::Start(with_attr(&e, "dxfId", Some(&id))?))?,
                None => writer.write_event(Event::Start(e))?,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"cfRule" => match remap(&e)? {
                Some(id) => writer.write_event(Event::Empty(with_attr(&e, "dxfId", Some(&id))?))?,
                None => writer.write_event(Event::Empty(e))?,
            },
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Highest rule priority used in the part, zero when it has no rules
pub fn max_rule_priority(xml: &[u8]) -> Result<u32> {
    let mut reader = Reader::from_reader(xml);
    let mut max = 0;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"cfRule" => {
                if let Some(priority) = attr(&e, b"priority")?.and_then(|p| p.parse::<u32>().ok()) {
                    max = max.max(priority);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(max)
}

/// A fill rule as a raw `<conditionalFormatting>` element
///
/// The formula is relative to the first cell of the range, e.g. `R2="ERR"`.
pub fn fill_rule(fill: &ConditionalFill, dxf_id: u32, priority: u32) -> String {
    let column = column_number_to_name(fill.col);
    let sqref = format!("{0}{1}:{0}{2}", column, fill.first_row + 1, fill.last_row + 1);
    let formula = format!("{}{}=\"{}\"", column, fill.first_row + 1, fill.equals);

    format!(
        "<conditionalFormatting sqref=\"{}\"><cfRule type=\"expression\" dxfId=\"{}\" priority=\"{}\"><formula>{}</formula></cfRule></conditionalFormatting>",
        sqref,
        dxf_id,
        priority,
        escape(formula.as_str())
    )
}

/// Insert raw `<conditionalFormatting>` elements at their place in the part
///
/// With `replace` the part's existing conditional formatting is dropped first.
pub fn set_conditional_formats(xml: &[u8], formats: &[String], replace: bool) -> Result<Vec<u8>> {
    let xml = if replace {
        remove_spans(xml, &root_child_spans(xml, b"conditionalFormatting")?)
    } else {
        xml.to_vec()
    };
    if formats.is_empty() {
        return Ok(xml);
    }
    insert_root_child(&xml, &AFTER_CONDITIONAL_FORMATTING, &formats.concat())
}
