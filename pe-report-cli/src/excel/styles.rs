//! Differential formats (`<dxfs>`) of `styles.xml`
//!
//! Conditional formatting rules point into this table by index. Entries are
//! compared as raw XML so a format copied between packages derived from the
//! same template resolves to the entry that already exists.

use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::xml::{child_spans, with_attr};

/// Elements that follow `<dxfs>` inside `<styleSheet>`
const AFTER_DXFS: [&[u8]; 3] = [b"tableStyles", b"colors", b"extLst"];

/// Raw `<dxf>` entries in table order
pub fn dxfs(xml: &[u8]) -> Result<Vec<String>> {
    child_spans(xml, b"dxfs", b"dxf")?
        .into_iter()
        .map(|span| Ok(std::str::from_utf8(&xml[span])?.to_string()))
        .collect()
}

/// A solid background fill as a differential format
pub fn fill_dxf(color: u32) -> String {
    format!(
        "<dxf><fill><patternFill patternType=\"solid\"><fgColor rgb=\"FF{color:06X}\"/><bgColor rgb=\"FF{color:06X}\"/></patternFill></fill></dxf>"
    )
}

/// Append entries to the table, creating it when the stylesheet has none
pub fn append_dxfs(xml: &[u8], added: &[String]) -> Result<Vec<u8>> {
    let existing = dxfs(xml)?.len();
    let count = (existing + added.len()).to_string();

    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + added.len() * 160));
    let mut depth = 0usize;
    let mut in_dxfs = false;
    let mut written = false;

    let write_table = |writer: &mut Writer<Vec<u8>>, start: BytesStart| -> Result<()> {
        writer.write_event(Event::Start(with_attr(&start, "count", Some(count.as_str()))?))?;
        for dxf in added {
            writer.get_mut().extend_from_slice(dxf.as_bytes());
        }
        writer.write_event(Event::End(BytesEnd::new(
            String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        )))?;
        Ok(())
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 1 && !written {
                    if e.local_name().as_ref() == b"dxfs" {
                        writer.write_event(Event::Start(with_attr(&e, "count", Some(count.as_str()))?))?;
                        in_dxfs = true;
                        depth += 1;
                        continue;
                    }
                    if AFTER_DXFS.contains(&e.local_name().as_ref()) {
                        write_table(&mut writer, BytesStart::new("dxfs"))?;
                        written = true;
                    }
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) => {
                if depth == 1 && !written {
                    if e.local_name().as_ref() == b"dxfs" {
                        write_table(&mut writer, e)?;
                        written = true;
                        continue;
                    }
                    if AFTER_DXFS.contains(&e.local_name().as_ref()) {
                        write_table(&mut writer, BytesStart::new("dxfs"))?;
                        written = true;
                    }
                }
                writer.write_event(Event::Empty(e))?;
            }
            Event::End(e) => {
                if in_dxfs && depth == 2 {
                    for dxf in added {
                        writer.get_mut().extend_from_slice(dxf.as_bytes());
                    }
                    in_dxfs = false;
                    written = true;
                } else if depth == 1 && !written {
                    write_table(&mut writer, BytesStart::new("dxfs"))?;
                    written = true;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}
