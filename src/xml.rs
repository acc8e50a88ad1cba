//! Minimal XML text helpers for the string-built payloads.

/// Escapes character data.
pub fn escape_text(text: &str) -> String {
    escape(text, false)
}

/// Escapes an attribute value written between double quotes.
pub fn escape_attr(text: &str) -> String {
    escape(text, true)
}

fn escape(text: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            '\'' if quotes => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps text in a CDATA section, splitting any embedded `]]>`.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
