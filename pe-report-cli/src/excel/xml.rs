//! Small quick-xml helpers shared by the package patchers
//!
//! Parts are rewritten as event streams; whatever a patcher does not touch is
//! written back unchanged. Element and attribute names are compared on their
//! local part so prefixed documents are handled too.

use std::ops::Range;

use anyhow::Result;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Value of the attribute whose local name is `name`
pub fn attr(element: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name {
            let raw = std::str::from_utf8(&attribute.value)?;
            return Ok(Some(unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

/// Copy of `element` with attribute `key` replaced, added or (for `None`) removed
pub fn with_attr<'a>(element: &BytesStart<'a>, key: &str, value: Option<&str>) -> Result<BytesStart<'a>> {
    let mut updated = element.clone();
    updated.clear_attributes();

    let mut found = false;
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == key.as_bytes() {
            found = true;
            if let Some(value) = value {
                updated.push_attribute((key, value));
            }
        } else {
            updated.push_attribute(attribute);
        }
    }
    if !found {
        if let Some(value) = value {
            updated.push_attribute((key, value));
        }
    }
    Ok(updated)
}

/// Byte spans of the `child` elements directly under the first top-level `parent`
pub fn child_spans(xml: &[u8], parent: &[u8], child: &[u8]) -> Result<Vec<Range<usize>>> {
    let mut reader = Reader::from_reader(xml);
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut inside = false;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                if inside && depth == 2 && e.local_name().as_ref() == child {
                    reader.read_to_end(e.name())?;
                    spans.push(start..reader.buffer_position() as usize);
                    continue;
                }
                if depth == 1 && e.local_name().as_ref() == parent {
                    inside = true;
                }
                depth += 1;
            }
            Event::Empty(e) if inside && depth == 2 && e.local_name().as_ref() == child => {
                spans.push(start..reader.buffer_position() as usize);
            }
            Event::End(_) => {
                if inside && depth == 2 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(spans)
}

/// Byte spans of the `name` elements that are direct children of the root
pub fn root_child_spans(xml: &[u8], name: &[u8]) -> Result<Vec<Range<usize>>> {
    let mut reader = Reader::from_reader(xml);
    let mut spans = Vec::new();
    let mut depth = 0usize;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 1 && e.local_name().as_ref() == name {
                    reader.read_to_end(e.name())?;
                    spans.push(start..reader.buffer_position() as usize);
                    continue;
                }
                depth += 1;
            }
            Event::Empty(e) if depth == 1 && e.local_name().as_ref() == name => {
                spans.push(start..reader.buffer_position() as usize);
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(spans)
}

/// Copy of `xml` without the given byte spans
pub fn remove_spans(xml: &[u8], spans: &[Range<usize>]) -> Vec<u8> {
    let mut kept = Vec::with_capacity(xml.len());
    let mut at = 0;
    for span in spans {
        kept.extend_from_slice(&xml[at..span.start]);
        at = span.end;
    }
    kept.extend_from_slice(&xml[at..]);
    kept
}

/// Insert a raw fragment under the root, before the first child named in `followers`
///
/// Without such a child the fragment goes last.
pub fn insert_root_child(xml: &[u8], followers: &[&[u8]], fragment: &str) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut depth = 0usize;
    let mut at = None;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 1 && followers.contains(&e.local_name().as_ref()) {
                    at = Some(start);
                    break;
                }
                depth += 1;
            }
            Event::Empty(e) if depth == 1 && followers.contains(&e.local_name().as_ref()) => {
                at = Some(start);
                break;
            }
            Event::End(_) => {
                if depth == 1 {
                    at = Some(start);
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(at) = at else {
        anyhow::bail!("document has no root element");
    };
    let mut updated = Vec::with_capacity(xml.len() + fragment.len());
    updated.extend_from_slice(&xml[..at]);
    updated.extend_from_slice(fragment.as_bytes());
    updated.extend_from_slice(&xml[at..]);
    Ok(updated)
}

/// Rewrite the start tag of every element named `name`
pub fn update_elements<F>(xml: &[u8], name: &[u8], mut update: F) -> Result<Vec<u8>>
where
    F: FnMut(&BytesStart) -> Result<BytesStart<'static>>,
{
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == name => {
                writer.write_event(Event::Start(update(&e)?))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == name => {
                writer.write_event(Event::Empty(update(&e)?))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}

/// Drop every element named `name` for which `remove` returns true
pub fn remove_elements<F>(xml: &[u8], name: &[u8], mut remove: F) -> Result<Vec<u8>>
where
    F: FnMut(&BytesStart) -> Result<bool>,
{
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == name => {
                if remove(&e)? {
                    reader.read_to_end(e.name())?;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == name => {
                if !remove(&e)? {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}

/// Insert a raw fragment right before the first closing tag of `parent`
pub fn insert_before_end(xml: &[u8], parent: &[u8], fragment: &str) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + fragment.len()));
    let mut inserted = false;

    loop {
        match reader.read_event()? {
            Event::End(e) if !inserted && e.local_name().as_ref() == parent => {
                writer.get_mut().extend_from_slice(fragment.as_bytes());
                inserted = true;
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) if !inserted && e.local_name().as_ref() == parent => {
                writer.write_event(Event::Start(e.clone()))?;
                writer.get_mut().extend_from_slice(fragment.as_bytes());
                inserted = true;
                writer.write_event(Event::End(e.to_end()))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !inserted {
        anyhow::bail!(
            "element <{}> not found",
            String::from_utf8_lossy(parent)
        );
    }
    Ok(writer.into_inner())
}
