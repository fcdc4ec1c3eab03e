use once_cell::sync::Lazy;
use regex::Regex;

static XMLNS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sxmlns\s*=").unwrap());
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)\s([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Byte span of an opening tag within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTag {
    pub start: usize,
    /// Index one past the closing `>`.
    pub end: usize,
    pub self_closing: bool,
}

impl OpenTag {
    /// Position where a new attribute can be inserted: before `>` or `/>`.
    pub fn insert_at(&self) -> usize {
        if self.self_closing { self.end - 2 } else { self.end - 1 }
    }

    pub fn text<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.start..self.end]
    }

    /// Value of a quoted attribute on this tag.
    pub fn attr<'a>(&self, doc: &'a str, name: &str) -> Option<&'a str> {
        let text = self.text(doc);
        ATTR_RE.captures_iter(text).find_map(|caps| {
            if &caps[1] != name {
                return None;
            }
            caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str())
        })
    }

    pub fn has_attr(&self, doc: &str, name: &str) -> bool {
        self.attr(doc, name).is_some()
    }
}

/// Start offset of the first `<name` that is followed by whitespace, `>` or
/// `/`, so `<line` does not match `<linearGradient`.
pub fn find_open(doc: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut from = 0;
    while let Some(idx) = doc[from..].find(&needle) {
        let start = from + idx;
        let after = start + needle.len();
        match doc[after..].chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(start),
            None => return Some(start),
            _ => from = after,
        }
    }
    None
}

/// The first complete `<svg ...>` opening tag. `None` when there is no
/// `<svg` or its tag is cut off before `>`.
pub fn svg_open_tag(doc: &str) -> Option<OpenTag> {
    let start = find_open(doc, "svg")?;
    let end = tag_end(doc, start)?;
    Some(OpenTag {
        start,
        end,
        self_closing: doc[..end].ends_with("/>"),
    })
}

pub fn has_svg_open(doc: &str) -> bool {
    find_open(doc, "svg").is_some()
}

pub fn has_svg_close(doc: &str) -> bool {
    doc.contains("</svg>")
}

/// Whether a default namespace is declared anywhere in the text.
pub fn has_xmlns(doc: &str) -> bool {
    XMLNS_RE.is_match(doc)
}

/// Index one past the `>` that ends the tag starting at `start`, skipping
/// `>` inside quoted attribute values.
fn tag_end(doc: &str, start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, c) in doc[start..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(start + offset + 1),
            None => {}
        }
    }
    None
}
