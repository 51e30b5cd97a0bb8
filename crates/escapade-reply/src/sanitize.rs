//! Author markup sanitising.
//!
//! Bodies keep only `<p> <em> <strong> <br> <b> <i>`, without attributes.

use std::sync::LazyLock;

use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("entity pattern is valid")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9]*)[^>]*>").expect("tag pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?(p|em|strong|br|b|i)>").expect("markup pattern is valid")
});

const ALLOWED_TAGS: [&str; 6] = ["p", "em", "strong", "br", "b", "i"];

/// Sanitises author text for a reply body: decodes entities, collapses
/// whitespace, drops `"` and every tag outside the allow-list.
#[must_use]
pub fn sanitize_body(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let collapsed = WHITESPACE.replace_all(&decoded, " ");
    let unquoted = collapsed.replace('"', "");
    let uncommented = COMMENT.replace_all(&unquoted, "");
    let filtered = TAG.replace_all(&uncommented, |caps: &Captures<'_>| {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        match name.as_str() {
            "br" if closing => String::new(),
            "br" => "<br>".to_owned(),
            allowed if ALLOWED_TAGS.contains(&allowed) => {
                format!("<{}{allowed}>", if closing { "/" } else { "" })
            }
            _ => String::new(),
        }
    });
    WHITESPACE.replace_all(&filtered, " ").trim().to_owned()
}

/// Returns `true` if a sanitised body contains allow-listed markup.
#[must_use]
pub fn contains_markup(body: &str) -> bool {
    MARKUP.is_match(body)
}

/// Reduces author text to what a player could type back: entities decoded,
/// every tag removed, whitespace collapsed and trimmed.
#[must_use]
pub fn plain_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let uncommented = COMMENT.replace_all(&decoded, "");
    let untagged = TAG.replace_all(&uncommented, " ");
    WHITESPACE.replace_all(&untagged, " ").trim().to_owned()
}

/// Decodes numeric references and every named HTML5 entity. Unknown names
/// are kept verbatim.
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    ENTITY
        .replace_all(raw, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                resolve_html5_entity(name).map(str::to_owned)
            };
            decoded.unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_tags_survive_and_lose_attributes() {
        let body = sanitize_body(r#"<p class="lead">Hi <strong style="x">there</strong></p>"#);

        assert_eq!(body, "<p>Hi <strong>there</strong></p>");
    }

    #[test]
    fn test_disallowed_tags_are_stripped() {
        let body = sanitize_body("<div><p>Run</p><script>x</script><span>now</span></div>");

        assert_eq!(body, "<p>Run</p>xnow");
    }

    #[test]
    fn test_entities_are_decoded_before_stripping() {
        assert_eq!(sanitize_body("Caff&egrave; &amp; t&#233;"), "Caffè & té");
        assert_eq!(sanitize_body("&lt;u&gt;under&lt;/u&gt;"), "under");
    }

    #[test]
    fn test_every_html5_named_entity_is_decoded() {
        assert_eq!(sanitize_body("M&uuml;ller"), "Müller");
        assert_eq!(sanitize_body("20&deg;C"), "20°C");
        assert_eq!(sanitize_body("Vai &rarr; nord"), "Vai → nord");
        assert_eq!(sanitize_body("&Ograve;&frac12;"), "Ò½");
    }

    #[test]
    fn test_whitespace_is_collapsed_and_trimmed() {
        assert_eq!(
            sanitize_body("  one\n\n two&nbsp;&nbsp;three\t"),
            "one two three"
        );
    }

    #[test]
    fn test_quotes_are_stripped() {
        assert_eq!(sanitize_body(r#"He said "open""#), "He said open");
        assert_eq!(sanitize_body("&quot;quoted&quot;"), "quoted");
    }

    #[test]
    fn test_br_is_normalised() {
        assert_eq!(sanitize_body("a<BR/>b<br />c</br>"), "a<br>b<br>c");
    }

    #[test]
    fn test_contains_markup_only_for_allowed_tags() {
        assert!(contains_markup("<p>x</p>"));
        assert!(contains_markup("a<br>b"));
        assert!(!contains_markup("plain 1 < 2"));
    }

    #[test]
    fn test_plain_text_strips_every_tag() {
        assert_eq!(plain_text("<p>Hello</p>"), "Hello");
        assert_eq!(plain_text("  <p><b>Ciao</b>   mondo</p> "), "Ciao mondo");
    }

    #[test]
    fn test_unknown_entities_are_kept() {
        assert_eq!(decode_entities("&bogus; &#x41;"), "&bogus; A");
        assert_eq!(decode_entities("&notanentity; &#xZZ;"), "&notanentity; &#xZZ;");
    }
}
