//! Allow-list markup sanitization for manifest-supplied text
//!
//! Two named policies cover the two kinds of fields a manifest carries:
//! [`Policy::restrictive`] for short, plain-text-ish fields (author names,
//! screenshot captions) and [`Policy::content`] for free-text sections
//! (description, changelog, installation notes).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Inline phrasing tags safe in short fields, with their allowed attributes.
const RESTRICTIVE_TAGS: &[(&str, &[&str])] = &[
    ("a", &["href", "title", "rel", "target"]),
    ("abbr", &["title"]),
    ("acronym", &["title"]),
    ("b", &[]),
    ("blockquote", &["cite"]),
    ("cite", &[]),
    ("code", &[]),
    ("del", &["datetime"]),
    ("em", &[]),
    ("i", &[]),
    ("q", &["cite"]),
    ("s", &[]),
    ("strike", &[]),
    ("strong", &[]),
];

/// Structural tags additionally allowed in free-text content sections.
const CONTENT_TAGS: &[(&str, &[&str])] = &[
    ("p", &[]),
    ("br", &[]),
    ("hr", &[]),
    ("ul", &[]),
    ("ol", &["start"]),
    ("li", &[]),
    ("dl", &[]),
    ("dt", &[]),
    ("dd", &[]),
    ("h1", &[]),
    ("h2", &[]),
    ("h3", &[]),
    ("h4", &[]),
    ("h5", &[]),
    ("h6", &[]),
    ("pre", &[]),
    ("img", &["src", "alt", "title", "width", "height"]),
    ("span", &[]),
    ("div", &[]),
    ("table", &[]),
    ("thead", &[]),
    ("tbody", &[]),
    ("tr", &[]),
    ("td", &[]),
    ("th", &[]),
];

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("valid tag pattern"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z][a-zA-Z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute pattern")
});

/// A named tag/attribute allow-list.
pub struct Policy {
    allowed: HashMap<&'static str, &'static [&'static str]>,
}

impl Policy {
    /// Policy for short fields that may carry light inline markup.
    pub fn restrictive() -> Self {
        Self {
            allowed: RESTRICTIVE_TAGS.iter().copied().collect(),
        }
    }

    /// Policy for free-text sections; allows the restrictive set plus
    /// structural content tags.
    pub fn content() -> Self {
        Self {
            allowed: RESTRICTIVE_TAGS
                .iter()
                .chain(CONTENT_TAGS.iter())
                .copied()
                .collect(),
        }
    }

    fn allows(&self, tag: &str) -> Option<&'static [&'static str]> {
        self.allowed.get(tag).copied()
    }
}

/// Strip disallowed tags (keeping their inner text) and rebuild allowed tags
/// with only allow-listed attributes. URL-bearing attributes with script
/// schemes are dropped.
pub fn sanitize(input: &str, policy: &Policy) -> String {
    let input = COMMENT_RE.replace_all(input, "");

    TAG_RE
        .replace_all(&input, |caps: &Captures| {
            let closing = !caps[1].is_empty();
            let name = caps[2].to_lowercase();

            let Some(allowed_attrs) = policy.allows(&name) else {
                return String::new();
            };

            if closing {
                return format!("</{name}>");
            }

            let mut tag = format!("<{name}");
            for attr in ATTR_RE.captures_iter(&caps[3]) {
                let attr_name = attr[1].to_lowercase();
                if !allowed_attrs.contains(&attr_name.as_str()) {
                    continue;
                }
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                if is_url_attr(&attr_name) && has_script_scheme(value) {
                    continue;
                }
                tag.push_str(&format!(" {attr_name}=\"{}\"", escape_attr(value)));
            }

            if caps[3].trim_end().ends_with('/') {
                tag.push_str(" />");
            } else {
                tag.push('>');
            }
            tag
        })
        .into_owned()
}

/// Remove all markup, keeping only text content.
pub fn strip_tags(input: &str) -> String {
    let input = COMMENT_RE.replace_all(input, "");
    TAG_RE.replace_all(&input, "").into_owned()
}

/// Escape a value for placement inside a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn is_url_attr(name: &str) -> bool {
    matches!(name, "href" | "src" | "cite")
}

fn has_script_scheme(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    normalized.starts_with("javascript:") || normalized.starts_with("vbscript:") || normalized.starts_with("data:")
}
