//! An xlsx template patched in place
//!
//! The package keeps every part of the workbook it was read from. Reports only
//! touch cell values and conditional formats of their worksheet, so number
//! formats, fonts, column widths, merged regions, drawings and print settings
//! of the template reach the output unchanged.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use super::parts::Parts;
use super::styles::{append_dxfs, dxfs, fill_dxf};
use super::workbook::{ConditionalFill, Sheet};
use super::worksheet;
use super::xml::{
    attr, insert_before_end, insert_root_child, remove_elements, root_child_spans, update_elements,
    with_attr,
};

const CONTENT_TYPES: &str = "[Content_Types].xml";
const WORKSHEET_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Elements that follow `<calcPr>` inside `<workbook>`
const AFTER_CALC_PR: [&[u8]; 9] = [
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    rel_id: String,
    part: String,
}

/// A worksheet's `<conditionalFormatting>` element with the differential
/// formats its rules point at, keyed by their index in the source package
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFormat {
    xml: String,
    dxfs: Vec<(u32, String)>,
}

#[derive(Debug, Clone)]
pub struct Package {
    parts: Parts,
    workbook_part: String,
    styles_part: Option<String>,
    /// Qualified name of the relationship attribute on `<sheet>`, e.g. `r:id`
    relationship_key: String,
    sheets: Vec<SheetEntry>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let parts = Parts::from_bytes(bytes)?;

        let root = relationships(
            parts
                .part("_rels/.rels")
                .context("Package has no root relationships")?,
        )?;
        let workbook_part = root
            .iter()
            .find(|r| r.kind.ends_with("/officeDocument"))
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| "xl/workbook.xml".to_string());

        let dir = part_dir(&workbook_part);
        let rels_part = rels_path(&workbook_part);
        let rels = relationships(
            parts
                .part(&rels_part)
                .with_context(|| format!("Package has no part '{}'", rels_part))?,
        )?;
        let styles_part = rels
            .iter()
            .find(|r| r.kind.ends_with("/styles"))
            .map(|r| resolve_target(dir, &r.target));

        let workbook = parts
            .part(&workbook_part)
            .with_context(|| format!("Package has no part '{}'", workbook_part))?;
        let mut sheets = Vec::new();
        let mut relationship_key = None;
        let mut reader = Reader::from_reader(workbook);
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                    let name = attr(&e, b"name")?.context("Workbook sheet without a name")?;
                    let rel_id = attr(&e, b"id")?
                        .with_context(|| format!("Sheet '{}' has no relationship id", name))?;
                    let rel = rels
                        .iter()
                        .find(|r| r.id == rel_id)
                        .with_context(|| format!("Sheet '{}' has no worksheet part", name))?;

                    if relationship_key.is_none() {
                        relationship_key = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.local_name().as_ref() == b"id")
                            .map(|a| String::from_utf8_lossy(a.key.as_ref()).into_owned());
                    }
                    sheets.push(SheetEntry {
                        name,
                        rel_id,
                        part: resolve_target(dir, &rel.target),
                    });
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self {
            parts,
            styles_part,
            relationship_key: relationship_key.unwrap_or_else(|| "r:id".to_string()),
            sheets,
            workbook_part,
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Raw XML of the named worksheet
    pub fn sheet_xml(&self, name: &str) -> Result<&[u8]> {
        self.part(&self.sheet_part(name)?)
    }

    /// Drop every sheet except `name`; returns false when `name` is absent
    ///
    /// Names scoped to a dropped sheet, or global names pointing into one, are
    /// removed with it so the remaining workbook has no dangling references.
    pub fn retain_only(&mut self, name: &str) -> Result<bool> {
        let Some(kept) = self.sheets.iter().position(|s| s.name == name) else {
            return Ok(false);
        };
        let removed: Vec<SheetEntry> = self
            .sheets
            .iter()
            .filter(|s| s.name != name)
            .cloned()
            .collect();
        if removed.is_empty() {
            return Ok(true);
        }

        let removed_names: Vec<String> = removed.iter().map(|s| s.name.clone()).collect();
        let workbook = self.part(&self.workbook_part)?;
        let workbook = remove_elements(workbook, b"sheet", |e| {
            Ok(attr(e, b"name")?.as_deref() != Some(name))
        })?;
        let workbook = retain_defined_names(&workbook, kept, &removed_names)?;
        let workbook = update_elements(&workbook, b"workbookView", |e| {
            let e = with_attr(e, "activeTab", None)?;
            Ok(with_attr(&e, "firstSheet", None)?.into_owned())
        })?;
        self.parts.set_part(&self.workbook_part, workbook);

        let removed_ids: BTreeSet<&str> = removed.iter().map(|s| s.rel_id.as_str()).collect();
        let rels_part = rels_path(&self.workbook_part);
        let rels = remove_elements(self.part(&rels_part)?, b"Relationship", |e| {
            Ok(attr(e, b"Id")?.is_some_and(|id| removed_ids.contains(id.as_str())))
        })?;
        self.parts.set_part(&rels_part, rels);

        let removed_parts: Vec<String> = removed.iter().map(|s| s.part.clone()).collect();
        self.remove_overrides(&removed_parts)?;
        for part in &removed_parts {
            self.parts.remove_part(part);
            self.parts.remove_part(&rels_path(part));
        }

        self.sheets.retain(|s| s.name == name);
        log::debug!("Kept sheet '{}', dropped {}", name, removed_names.join(", "));
        Ok(true)
    }

    /// Write the cells of `after` that differ from `before` into its worksheet
    ///
    /// Conditional fills present in `after` but not in `before` are added as
    /// formula rules with their own differential formats.
    pub fn patch_sheet(&mut self, before: &Sheet, after: &Sheet) -> Result<()> {
        let part = self.sheet_part(after.name())?;
        let changed = after.changed_cells(before);
        let mut xml = worksheet::patch_cells(self.part(&part)?, after, &changed)
            .with_context(|| format!("Failed to patch sheet '{}'", after.name()))?;

        let fills: Vec<&ConditionalFill> = after
            .conditional_fills()
            .iter()
            .filter(|fill| !before.conditional_fills().contains(fill))
            .collect();
        if !fills.is_empty() {
            let formats: Vec<String> = fills.iter().map(|fill| fill_dxf(fill.color)).collect();
            let ids = self.ensure_dxfs(&formats)?;
            let mut priority = worksheet::max_rule_priority(&xml)?;
            let rules: Vec<String> = fills
                .iter()
                .zip(ids)
                .map(|(fill, id)| {
                    priority += 1;
                    worksheet::fill_rule(fill, id, priority)
                })
                .collect();
            xml = worksheet::set_conditional_formats(&xml, &rules, false)?;
        }

        log::debug!("Patched {} cells of sheet '{}'", changed.len(), after.name());
        self.parts.set_part(&part, xml);
        Ok(())
    }

    /// Conditional formats of the named worksheet
    pub fn conditional_formats(&self, name: &str) -> Result<Vec<ConditionalFormat>> {
        let xml = self.sheet_xml(name)?;
        let table = match &self.styles_part {
            Some(styles) => dxfs(self.part(styles)?)?,
            None => Vec::new(),
        };

        Ok(worksheet::conditional_formats(xml)?
            .into_iter()
            .map(|(xml, ids)| ConditionalFormat {
                xml,
                dxfs: ids
                    .into_iter()
                    .filter_map(|id| table.get(id as usize).map(|dxf| (id, dxf.clone())))
                    .collect(),
            })
            .collect())
    }

    /// Replace the conditional formats of the named worksheet with formats
    /// taken from another package
    pub fn replace_conditional_formats(&mut self, name: &str, formats: &[ConditionalFormat]) -> Result<()> {
        let part = self.sheet_part(name)?;

        let mut wanted: Vec<(u32, String)> = Vec::new();
        for format in formats {
            for dxf in &format.dxfs {
                if !wanted.contains(dxf) {
                    wanted.push(dxf.clone());
                }
            }
        }
        let new_ids = if wanted.is_empty() {
            Vec::new()
        } else {
            let entries: Vec<String> = wanted.iter().map(|(_, dxf)| dxf.clone()).collect();
            self.ensure_dxfs(&entries)?
        };
        let ids: BTreeMap<u32, u32> = wanted.iter().map(|(id, _)| *id).zip(new_ids).collect();

        let fragments = formats
            .iter()
            .map(|format| worksheet::remap_dxf_ids(&format.xml, &ids))
            .collect::<Result<Vec<_>>>()?;
        let xml = worksheet::set_conditional_formats(self.part(&part)?, &fragments, true)?;
        self.parts.set_part(&part, xml);
        Ok(())
    }

    /// Add `sheet` as a new last worksheet
    pub fn append_sheet(&mut self, sheet: &Sheet) -> Result<()> {
        if self.sheets.iter().any(|s| s.name == sheet.name()) {
            bail!("Sheet '{}' already exists", sheet.name());
        }

        let dir = part_dir(&self.workbook_part).to_string();
        let (part, target) = (1..)
            .map(|n| format!("worksheets/sheet{}.xml", n))
            .map(|target| (resolve_target(&dir, &target), target))
            .find(|(part, _)| !self.parts.contains(part))
            .context("No free worksheet part name")?;

        let rels_part = rels_path(&self.workbook_part);
        let rels = self.part(&rels_part)?;
        let used: BTreeSet<String> = relationships(rels)?.into_iter().map(|r| r.id).collect();
        let rel_id = (1..)
            .map(|n| format!("rId{}", n))
            .find(|id| !used.contains(id))
            .context("No free relationship id")?;
        let relationship = format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            rel_id, WORKSHEET_RELATIONSHIP, target
        );
        let rels = insert_before_end(rels, b"Relationships", &relationship)?;
        self.parts.set_part(&rels_part, rels);

        let content_type = format!(
            r#"<Override PartName="/{}" ContentType="{}"/>"#,
            part, WORKSHEET_CONTENT_TYPE
        );
        let content_types = insert_before_end(self.part(CONTENT_TYPES)?, b"Types", &content_type)?;
        self.parts.set_part(CONTENT_TYPES, content_types);

        let workbook = self.part(&self.workbook_part)?;
        let entry = format!(
            r#"<sheet name="{}" sheetId="{}" {}="{}"/>"#,
            escape(sheet.name()),
            max_sheet_id(workbook)? + 1,
            self.relationship_key,
            rel_id
        );
        let workbook = insert_before_end(workbook, b"sheets", &entry)?;
        self.parts.set_part(&self.workbook_part, workbook);

        let cells = sheet.cells().map(|(row, col, _)| (row, col)).collect();
        let xml = worksheet::patch_cells(&worksheet::blank_worksheet(), sheet, &cells)?;
        self.parts.set_part(&part, xml);

        log::debug!("Appended sheet '{}' as {}", sheet.name(), part);
        self.sheets.push(SheetEntry {
            name: sheet.name().to_string(),
            rel_id,
            part,
        });
        Ok(())
    }

    /// Serialize the package, asking the viewer to recalculate every formula on open
    ///
    /// The calculation chain lists formula cells by position and would be stale
    /// after patching, so it is dropped and rebuilt by the viewer.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.drop_calc_chain()?;

        let workbook = self.part(&self.workbook_part)?;
        let workbook = if root_child_spans(workbook, b"calcPr")?.is_empty() {
            insert_root_child(workbook, &AFTER_CALC_PR, r#"<calcPr fullCalcOnLoad="1"/>"#)?
        } else {
            update_elements(workbook, b"calcPr", |e| {
                Ok(with_attr(e, "fullCalcOnLoad", Some("1"))?.into_owned())
            })?
        };
        self.parts.set_part(&self.workbook_part, workbook);

        self.parts.to_bytes().context("Failed to serialize Excel workbook")
    }

    fn part(&self, name: &str) -> Result<&[u8]> {
        self.parts
            .part(name)
            .with_context(|| format!("Package has no part '{}'", name))
    }

    fn sheet_part(&self, name: &str) -> Result<String> {
        match self.sheets.iter().find(|s| s.name == name) {
            Some(sheet) => Ok(sheet.part.clone()),
            None => bail!("Sheet '{}' not found in package", name),
        }
    }

    /// Indices of `entries` in the differential format table, appending the
    /// ones the table does not have yet
    fn ensure_dxfs(&mut self, entries: &[String]) -> Result<Vec<u32>> {
        let styles = self
            .styles_part
            .clone()
            .context("Workbook has no styles part")?;
        let xml = self.part(&styles)?;

        let mut table = dxfs(xml)?;
        let mut added = Vec::new();
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = match table.iter().position(|dxf| dxf == entry) {
                Some(id) => id,
                None => {
                    table.push(entry.clone());
                    added.push(entry.clone());
                    table.len() - 1
                }
            };
            ids.push(id as u32);
        }

        if !added.is_empty() {
            let updated = append_dxfs(xml, &added)?;
            self.parts.set_part(&styles, updated);
        }
        Ok(ids)
    }

    fn remove_overrides(&mut self, parts: &[String]) -> Result<()> {
        let Some(xml) = self.parts.part(CONTENT_TYPES) else {
            return Ok(());
        };
        let updated = remove_elements(xml, b"Override", |e| {
            Ok(attr(e, b"PartName")?
                .is_some_and(|name| parts.iter().any(|part| name.trim_start_matches('/') == part)))
        })?;
        self.parts.set_part(CONTENT_TYPES, updated);
        Ok(())
    }

    fn drop_calc_chain(&mut self) -> Result<()> {
        let rels_part = rels_path(&self.workbook_part);
        let Some(rels) = self.parts.part(&rels_part) else {
            return Ok(());
        };

        let dir = part_dir(&self.workbook_part);
        let chains: Vec<String> = relationships(rels)?
            .into_iter()
            .filter(|r| r.kind.ends_with("/calcChain"))
            .map(|r| resolve_target(dir, &r.target))
            .collect();
        if chains.is_empty() {
            return Ok(());
        }

        let rels = remove_elements(rels, b"Relationship", |e| {
            Ok(attr(e, b"Type")?.is_some_and(|kind| kind.ends_with("/calcChain")))
        })?;
        self.parts.set_part(&rels_part, rels);
        self.remove_overrides(&chains)?;
        for part in &chains {
            self.parts.remove_part(part);
        }
        Ok(())
    }
}

fn relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut found = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                found.push(Relationship {
                    id: attr(&e, b"Id")?.unwrap_or_default(),
                    kind: attr(&e, b"Type")?.unwrap_or_default(),
                    target: attr(&e, b"Target")?.unwrap_or_default(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(found)
}

fn max_sheet_id(workbook: &[u8]) -> Result<u32> {
    let mut reader = Reader::from_reader(workbook);
    let mut max = 0;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let Some(id) = attr(&e, b"sheetId")?.and_then(|id| id.parse::<u32>().ok()) {
                    max = max.max(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(max)
}

/// Keep the defined names that still resolve once only sheet `kept` remains
fn retain_defined_names(xml: &[u8], kept: usize, removed: &[String]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = quick_xml::Writer::new(Vec::with_capacity(xml.len()));

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"definedName" => {
                let inner = reader.buffer_position() as usize;
                reader.read_to_end(e.name())?;
                let end = reader.buffer_position() as usize;
                let text_end = end.saturating_sub(e.name().as_ref().len() + 3).max(inner);
                let formula = quick_xml::escape::unescape(std::str::from_utf8(&xml[inner..text_end])?)?;

                match attr(&e, b"localSheetId")? {
                    Some(id) if id.trim().parse::<usize>().ok() == Some(kept) => {
                        writer.write_event(Event::Start(with_attr(&e, "localSheetId", Some("0"))?))?;
                        writer.get_mut().extend_from_slice(&xml[inner..end]);
                    }
                    Some(_) => {}
                    None if removed.iter().any(|sheet| refers_to(&formula, sheet)) => {}
                    None => writer.get_mut().extend_from_slice(&xml[start..end]),
                }
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}

/// Whether a formula references cells of `sheet`
fn refers_to(formula: &str, sheet: &str) -> bool {
    let quoted = format!("'{}'!", sheet.replace('\'', "''"));
    if formula.contains(&quoted) {
        return true;
    }
    let plain = format!("{}!", sheet);
    formula.match_indices(&plain).any(|(at, _)| {
        formula[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '.'))
    })
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// `xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(dir: &str, target: &str) -> String {
    let (mut segments, target) = match target.strip_prefix('/') {
        Some(absolute) => (Vec::new(), absolute),
        None => (
            dir.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>(),
            target,
        ),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}
