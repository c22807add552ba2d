use std::sync::LazyLock;

use regex::Regex;

use crate::error::ImportError;

/// Prefix of the marker line that carries the attributes of an ordered list.
pub const ATTRIBUTES_MARKER: &str = "///attributes:";

static OL_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<ol(\s[^>]*?)?\s*/?>").expect("ol pattern"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern")
});

/// Converts the HTML stored in comments-like fields into note markdown.
pub trait HtmlConverter: Send + Sync {
    fn to_markdown(&self, html: &str) -> crate::Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct Html2MdConverter {
    insert_attributes: bool,
}

impl Html2MdConverter {
    #[must_use]
    pub fn new(insert_attributes: bool) -> Self {
        Self { insert_attributes }
    }
}

impl HtmlConverter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> crate::Result<String> {
        if !self.insert_attributes {
            return Ok(html2md::parse_html(html));
        }

        // Markers are smuggled through the converter as plain words and swapped back afterwards.
        let mut markers = Vec::new();
        let mut prepared = String::with_capacity(html.len());
        let mut last = 0;
        for caps in OL_OPEN.captures_iter(html) {
            let Some(whole) = caps.get(0) else { continue };
            let attributes = match caps.get(1) {
                Some(raw) => parse_attributes(raw.as_str())?,
                None => Vec::new(),
            };
            prepared.push_str(&html[last..whole.start()]);
            if !attributes.is_empty() {
                let token = format!("calibreimportattributes{}x", markers.len());
                prepared.push_str(&format!("<p>{token}</p>"));
                let line = attributes
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join(",");
                markers.push((token, format!("{ATTRIBUTES_MARKER}{line}")));
            }
            prepared.push_str(whole.as_str());
            last = whole.end();
        }
        prepared.push_str(&html[last..]);

        let mut markdown = html2md::parse_html(&prepared);
        for (token, marker) in markers {
            if !markdown.contains(&token) {
                return Err(ImportError::transform(
                    "ordered list attributes",
                    "attribute marker lost during conversion",
                ));
            }
            markdown = markdown.replacen(&token, &marker, 1);
        }
        Ok(markdown)
    }
}

fn parse_attributes(raw: &str) -> crate::Result<Vec<(String, String)>> {
    let raw = raw.trim().trim_end_matches('/');
    let mut attributes = Vec::new();
    let mut last = 0;
    for caps in ATTRIBUTE.captures_iter(raw) {
        let Some(whole) = caps.get(0) else { continue };
        if !raw[last..whole.start()].trim().is_empty() {
            return Err(malformed(raw));
        }
        let name = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str())
            .trim()
            .to_owned();
        attributes.push((name, value));
        last = whole.end();
    }
    if !raw[last..].trim().is_empty() {
        return Err(malformed(raw));
    }
    Ok(attributes)
}

fn malformed(raw: &str) -> ImportError {
    ImportError::transform(
        "ordered list attributes",
        format!("malformed attribute list: {raw:?}"),
    )
}
