//! Minimal streaming view over feed and sitemap XML.
//!
//! Both document kinds are read through [`walk`], which flattens
//! `quick-xml` events into [`Node`]s with namespace prefixes dropped
//! (`dc:date` is reported as `date`) and entities already resolved.

use crate::error::{CrawlError, Result};
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close {
        name: String,
    },
    Text(String),
}

/// Feed every node of `xml` to `visit`, in document order.
///
/// Self-closing elements produce an `Open` immediately followed by a
/// `Close`. Element and attribute names are local (namespace prefix
/// dropped). Text has entities resolved; CDATA is passed through verbatim.
/// Mismatched end tags are tolerated, since real-world feeds often have them.
///
/// # Arguments
///
/// * `xml` - Document text
/// * `source` - URL or label used in error messages
/// * `visit` - Callback invoked for each [`Node`]
///
/// # Errors
///
/// Returns [`CrawlError::Xml`](crate::error::CrawlError::Xml) on a syntax
/// error or an unresolvable entity reference.
///
/// # Example
///
/// ```ignore
/// let mut locs = Vec::new();
/// let mut in_loc = false;
/// walk(xml, url, |node| match node {
///     Node::Open { name, .. } => in_loc = name == "loc",
///     Node::Text(text) if in_loc => locs.push(text),
///     _ => {}
/// })?;
/// ```
pub fn walk<F>(xml: &str, source: &str, mut visit: F) -> Result<()>
where
    F: FnMut(Node),
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;

    loop {
        let event = reader.read_event().map_err(|e| CrawlError::Xml {
            url: source.to_string(),
            message: e.to_string(),
        })?;
        match event {
            Event::Start(e) => visit(Node::Open {
                name: element_name(&e),
                attrs: attributes(&e),
            }),
            Event::Empty(e) => {
                let name = element_name(&e);
                visit(Node::Open {
                    name: name.clone(),
                    attrs: attributes(&e),
                });
                visit(Node::Close { name });
            }
            Event::End(e) => visit(Node::Close {
                name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            }),
            Event::Text(e) => {
                let raw = String::from_utf8_lossy(&e);
                let text = unescape(&raw)
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                visit(Node::Text(text));
            }
            Event::CData(e) => visit(Node::Text(String::from_utf8_lossy(&e).into_owned())),
            Event::GeneralRef(r) => visit(Node::Text(resolve_reference(&r))),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// Look up an attribute by (local) name.
pub fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            let value = unescape(&raw).map(|v| v.into_owned()).unwrap_or(raw);
            (key, value)
        })
        .collect()
}

fn resolve_reference(r: &BytesRef<'_>) -> String {
    if let Ok(Some(ch)) = r.resolve_char_ref() {
        return ch.to_string();
    }
    let name = String::from_utf8_lossy(r);
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("&{name};"))
}
