//! User content → HTML.

/// Escapes the HTML-significant characters and turns each line break
/// (`\r\n`, `\n` or a lone `\r`) into `<br />`. The result is safe to embed
/// as element content without further escaping.
pub fn content_to_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '`' => out.push_str("&#96;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("<br />");
            }
            '\n' => out.push_str("<br />"),
            other => out.push(other),
        }
    }

    out
}
