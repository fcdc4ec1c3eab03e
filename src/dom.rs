use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("unclosed element <{0}> at end of input")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("content after the root element at byte {0}")]
    TrailingContent(u64),
    #[error("undefined entity reference &{0};")]
    UndefinedEntity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Escaped value as it appeared in the source.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|attr| attr.name != name);
        before != self.attributes.len()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Drop every descendant element for which `keep` is false, subtree
    /// included. Returns the number of elements removed.
    pub fn retain_descendants<F>(&mut self, keep: &mut F) -> usize
    where
        F: FnMut(&Element) -> bool,
    {
        let mut removed = 0;
        self.children.retain(|child| match child {
            Node::Element(el) if !keep(el) => {
                removed += 1;
                false
            }
            _ => true,
        });
        for child in &mut self.children {
            if let Node::Element(el) = child {
                removed += el.retain_descendants(keep);
            }
        }
        removed
    }

    /// Visit this element and all descendant elements, parents first.
    pub fn walk_mut<F>(&mut self, visit: &mut F)
    where
        F: FnMut(&mut Element),
    {
        visit(self);
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.walk_mut(visit);
            }
        }
    }

    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Element),
    {
        visit(self);
        for el in self.child_elements() {
            el.walk(visit);
        }
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&attr.value.replace('"', "&quot;"));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.write_xml(out),
                Node::Text(text) => out.push_str(text),
                Node::CData(data) => {
                    out.push_str("<![CDATA[");
                    out.push_str(data);
                    out.push_str("]]>");
                }
                Node::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Parse `input` into its root element.
pub fn parse(input: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|err| XmlError::Malformed {
            position,
            message: err.to_string(),
        })?;
        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::TrailingContent(position));
                }
                stack.push(element_from_start(&start, position)?);
            }
            Event::Empty(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::TrailingContent(position));
                }
                let el = element_from_start(&start, position)?;
                close_element(el, &mut stack, &mut root);
            }
            Event::End(end) => {
                let qname = end.name();
                let name = utf8(qname.as_ref(), position)?;
                let Some(el) = stack.pop() else {
                    return Err(XmlError::Malformed {
                        position,
                        message: format!("unexpected </{name}>"),
                    });
                };
                if el.name != name {
                    return Err(XmlError::Malformed {
                        position,
                        message: format!("expected </{}>, found </{name}>", el.name),
                    });
                }
                close_element(el, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let raw = utf8(&text, position)?;
                if raw.contains('&') {
                    return Err(XmlError::Malformed {
                        position,
                        message: "unescaped '&' in text".to_string(),
                    });
                }
                match stack.last_mut() {
                    Some(parent) => push_text(parent, raw),
                    None if raw.trim().is_empty() => {}
                    None => return Err(XmlError::TrailingContent(position)),
                }
            }
            Event::GeneralRef(reference) => {
                let name = utf8(&reference, position)?;
                if !is_known_entity(name) {
                    return Err(XmlError::UndefinedEntity(name.to_string()));
                }
                let Some(parent) = stack.last_mut() else {
                    return Err(XmlError::TrailingContent(position));
                };
                push_text(parent, &format!("&{name};"));
            }
            Event::CData(data) => {
                let raw = utf8(&data, position)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(raw.to_string())),
                    None => return Err(XmlError::TrailingContent(position)),
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let raw = utf8(&comment, position)?;
                    parent.children.push(Node::Comment(raw.to_string()));
                }
            }
            Event::Eof => break,
            // Prolog, doctype and processing instructions carry nothing the
            // tree needs.
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
    let mut el = Element::new(utf8(start.name().as_ref(), position)?);
    for attr in start.attributes() {
        let attr = attr.map_err(|err| XmlError::Malformed {
            position,
            message: err.to_string(),
        })?;
        let name = utf8(attr.key.as_ref(), position)?.to_string();
        let value = utf8(&attr.value, position)?.to_string();
        if value.contains('<') {
            return Err(XmlError::Malformed {
                position,
                message: format!("'<' in value of attribute {name}"),
            });
        }
        check_references(&value, position)?;
        el.attributes.push(Attribute { name, value });
    }
    Ok(el)
}

fn close_element(el: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => *root = Some(el),
    }
}

fn push_text(parent: &mut Element, raw: &str) {
    if let Some(Node::Text(existing)) = parent.children.last_mut() {
        existing.push_str(raw);
    } else {
        parent.children.push(Node::Text(raw.to_string()));
    }
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|err| XmlError::Malformed {
        position,
        message: err.to_string(),
    })
}

/// Every `&` in an escaped value must start a predefined entity or a
/// character reference.
fn check_references(raw: &str, position: u64) -> Result<(), XmlError> {
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        let after = &rest[idx + 1..];
        let Some(end) = after.find(';') else {
            return Err(XmlError::Malformed {
                position,
                message: "unescaped '&' in attribute value".to_string(),
            });
        };
        let name = &after[..end];
        if !is_known_entity(name) {
            return Err(XmlError::UndefinedEntity(name.to_string()));
        }
        rest = &after[end + 1..];
    }
    Ok(())
}

pub(crate) fn is_known_entity(name: &str) -> bool {
    match name {
        "amp" | "lt" | "gt" | "quot" | "apos" => true,
        _ => {
            if let Some(hex) = name.strip_prefix("#x") {
                !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
            } else if let Some(dec) = name.strip_prefix('#') {
                !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
            } else {
                false
            }
        }
    }
}

/// Decode the predefined entities and character references of an escaped
/// attribute value. Unknown references are left as written.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let decoded = after.find(';').and_then(|end| {
            let name = &after[..end];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = if let Some(hex) = name.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = name.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                }
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
