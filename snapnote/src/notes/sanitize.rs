//! Markup neutralization for note content
//!
//! Stored content is replayed into rendering surfaces, so markup characters are
//! escaped before they reach the store. This matches assigning the text to a
//! DOM node's `textContent` and reading back `innerHTML`.

/// Escape `&`, `<` and `>` so the text renders literally
pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
