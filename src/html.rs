//! HTML construction helpers.
//!
//! [`SafeHtml`] can only be built from escaped text, escaped attributes or
//! markup that went through the post-content allow-list, so interpolated
//! strings never reach the output unescaped.

use std::fmt;

/// A fragment of markup that is safe to embed in a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
    /// Escaped text node.
    pub fn text(text: &str) -> Self {
        SafeHtml(escape(text))
    }

    /// Rich text filtered through the post-content allow-list.
    pub fn sanitized(markup: &str) -> Self {
        SafeHtml(sanitize_post_content(markup))
    }

    /// An element with escaped attribute values and the given children.
    pub fn element<I>(tag: &'static str, attrs: &[(&'static str, &str)], children: I) -> Self
    where
        I: IntoIterator<Item = SafeHtml>,
    {
        let mut out = String::new();
        out.push('<');
        out.push_str(tag);
        for (name, value) in attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        out.push('>');
        for child in children {
            out.push_str(&child.0);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        SafeHtml(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Filter rich text down to the tags allowed in post content.
///
/// `id` and `class` are kept on every allowed tag so anchors and wrappers
/// built by the generators survive a second pass.
pub fn sanitize_post_content(markup: &str) -> String {
    let mut policy = ammonia::Builder::default();
    policy.add_generic_attributes(&["id", "class"]).link_rel(None);
    policy.clean(markup).to_string()
}

/// Reduce operator text input to a single plain line: tags removed,
/// whitespace runs collapsed, ends trimmed.
pub fn plain_text(input: &str) -> String {
    let without_tags = ammonia::Builder::empty().clean(input).to_string();
    let decoded = without_tags
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// URL-safe slug: accents transliterated to ASCII, then lowercase letters
/// and digits with single hyphens between runs and none at the ends.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_hyphen = false;

    for c in ascii.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
