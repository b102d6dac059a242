//! HTML entity handling ahead of XML parsing.
//!
//! The XML reader only knows the five predefined entities. Named HTML
//! entities are converted to Unicode, and ampersands that do not start a
//! reference are escaped, so HTML text reads as well-formed XML.

use std::sync::LazyLock;

use regex::Regex;

/// An ampersand with the reference it starts, if any.
static AMPERSAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[a-zA-Z][a-zA-Z0-9]*;)?")
        .expect("invalid entity regex")
});

/// Convert named HTML entities to Unicode and escape dangling ampersands.
///
/// The predefined XML entities and numeric references are left for the
/// XML reader; unknown named entities are kept verbatim.
pub fn convert_html_entities(html: &str) -> String {
    AMPERSAND_PATTERN
        .replace_all(html, |caps: &regex::Captures| match caps.get(1) {
            None => "&amp;".to_owned(),
            Some(reference) => {
                let name = reference.as_str().trim_end_matches(';');
                entity_to_unicode(name).map_or_else(|| caps[0].to_owned(), str::to_owned)
            }
        })
        .into_owned()
}

/// Decode an entity reference reported by the XML reader.
pub fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => entity_to_unicode(entity).map_or_else(|| format!("&{entity};"), str::to_owned),
    }
}

/// Map HTML entity name to Unicode character.
fn entity_to_unicode(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{00a0}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "middot" => "\u{00b7}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        "harr" => "\u{2194}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        "rArr" => "\u{21d2}",
        "lArr" => "\u{21d0}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "plusmn" => "\u{00b1}",
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",
        "minus" => "\u{2212}",
        "infin" => "\u{221e}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        "yen" => "\u{00a5}",
        "cent" => "\u{00a2}",
        "deg" => "\u{00b0}",
        "para" => "\u{00b6}",
        "sect" => "\u{00a7}",
        "dagger" => "\u{2020}",
        "iexcl" => "\u{00a1}",
        "iquest" => "\u{00bf}",
        "frac12" => "\u{00bd}",
        "frac14" => "\u{00bc}",
        "frac34" => "\u{00be}",
        "check" => "\u{2713}",
        "zwj" => "\u{200d}",
        "zwnj" => "\u{200c}",
        "shy" => "\u{00ad}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_named_entities() {
        assert_eq!(
            convert_html_entities("a&nbsp;b&mdash;c"),
            "a\u{00a0}b\u{2014}c"
        );
    }

    #[test]
    fn test_xml_entities_are_kept() {
        assert_eq!(
            convert_html_entities("&lt;&amp;&quot;&#039;&#x27;"),
            "&lt;&amp;&quot;&#039;&#x27;"
        );
    }

    #[test]
    fn test_dangling_ampersand_is_escaped() {
        assert_eq!(convert_html_entities("Q&A & more"), "Q&amp;A &amp; more");
    }

    #[test]
    fn test_unknown_entity_is_kept() {
        assert_eq!(convert_html_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_decode_entity() {
        assert_eq!(decode_entity("lt"), "<");
        assert_eq!(decode_entity("#039"), "'");
        assert_eq!(decode_entity("#x41"), "A");
        assert_eq!(decode_entity("bogus"), "&bogus;");
    }
}
