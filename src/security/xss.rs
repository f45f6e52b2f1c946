//! XSS (Cross-Site Scripting) protection for broadcast content
//!
//! Everything a client sends is rendered by every other client, so user,
//! message and timestamp fields are entity-encoded before fan-out.

/// HTML entities for encoding special characters
const HTML_ENTITIES: &[(char, &str)] = &[
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
    ('`', "&#x60;"),
];

fn entity_for(c: char) -> Option<&'static str> {
    HTML_ENTITIES
        .iter()
        .find(|(special, _)| *special == c)
        .map(|(_, entity)| *entity)
}

/// Encode HTML entities and control characters.
///
/// Single pass, so `&` never gets double encoded. Control characters other
/// than tab and newline become numeric entities. Text without special
/// characters is returned unchanged.
pub fn encode_html(input: &str) -> String {
    let mut result = String::with_capacity(input.len());

    for c in input.chars() {
        if let Some(entity) = entity_for(c) {
            result.push_str(entity);
        } else if c.is_control() && c != '\n' && c != '\t' {
            result.push_str(&format!("&#x{:X};", c as u32));
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_markup(content: &str) -> bool {
        content.chars().any(|c| matches!(c, '<' | '>'))
    }

    #[test]
    fn test_html_encoding() {
        assert_eq!(
            encode_html("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
        assert_eq!(encode_html("Hello & goodbye"), "Hello &amp; goodbye");
        assert_eq!(encode_html("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_script_tag_has_no_markup() {
        let encoded = encode_html("<script>alert(1)</script>");
        assert!(!contains_markup(&encoded));
        assert!(!encoded.contains('<'));
        assert!(!encoded.contains('>'));
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(encode_html("hi"), "hi");
        assert_eq!(encode_html("see you at 10:30, ok?"), "see you at 10:30, ok?");
        assert_eq!(encode_html("héllo wörld ✓"), "héllo wörld ✓");
        assert_eq!(encode_html("line1\nline2\tend"), "line1\nline2\tend");
    }

    #[test]
    fn test_no_double_encoding() {
        assert_eq!(encode_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(encode_html("a\u{0}b"), "a&#x0;b");
        assert_eq!(encode_html("bell\u{7}"), "bell&#x7;");
        assert_eq!(encode_html("\r"), "&#xD;");
    }
}
