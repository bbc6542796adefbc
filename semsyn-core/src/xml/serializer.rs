//! Arena to XML text, via quick-xml

use super::{Document, NodeId, NodeKind};
use crate::error::{Result, SemsynError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

fn serialize_err(e: impl std::fmt::Display) -> SemsynError {
    SemsynError::Serialize(e.to_string())
}

pub(super) fn write_document<W: Write>(doc: &Document, out: W, indent: usize) -> Result<()> {
    let mut writer = if indent > 0 {
        Writer::new_with_indent(out, b' ', indent)
    } else {
        Writer::new(out)
    };
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(serialize_err)?;
    for child in doc.children(NodeId::DOCUMENT) {
        write_node(doc, &mut writer, *child)?;
    }
    writer.get_mut().write_all(b"\n").map_err(serialize_err)?;
    Ok(())
}

fn write_node<W: Write>(doc: &Document, writer: &mut Writer<W>, id: NodeId) -> Result<()> {
    match doc.kind(id) {
        Some(NodeKind::Text(text)) => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(serialize_err),
        Some(NodeKind::Element(element)) => {
            let name = element.name.to_string();
            let mut start = BytesStart::new(name.as_str());
            for (prefix, uri) in &element.namespace_decls {
                let key = match prefix {
                    Some(prefix) => format!("xmlns:{prefix}"),
                    None => "xmlns".to_string(),
                };
                start.push_attribute((key.as_str(), uri.as_str()));
            }
            for attribute in &element.attributes {
                let key = attribute.name.to_string();
                start.push_attribute((key.as_str(), attribute.value.as_str()));
            }

            let children = doc.children(id);
            if children.is_empty() {
                return writer
                    .write_event(Event::Empty(start))
                    .map_err(serialize_err);
            }
            writer
                .write_event(Event::Start(start))
                .map_err(serialize_err)?;
            for child in children {
                write_node(doc, writer, *child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(serialize_err)
        }
        _ => Ok(()),
    }
}
