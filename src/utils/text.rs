//! Text cleanup shared by the editor, OCR and the search backends.

use regex::Regex;
use std::sync::OnceLock;

/// Compile `pattern` once into `cell`; a pattern that fails to compile
/// disables the step using it
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid pattern {}: {}", pattern, e);
            None
        }
    })
    .as_ref()
}

fn markup_tags() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"</?[A-Za-z][^>]*>")
}

fn jats_title() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"(?s)<jats:title>.*?</jats:title>")
}

fn arxiv_doi() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"(?i)^10\.48550/arxiv\.(\d{4}\.\d{4,5}(v\d+)?)$")
}

/// Collapse a pasted or typed title onto one line.
///
/// Control characters become spaces, whitespace runs collapse to a single
/// space and the result is trimmed.
pub fn normalize_text(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip JATS/HTML markup from an abstract.
///
/// `<jats:title>` blocks (usually just "Abstract") are removed entirely and
/// common entities are unescaped.
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return normalize_text(text);
    }

    let mut text = text.to_string();
    for re in [jats_title(), markup_tags()].into_iter().flatten() {
        text = re.replace_all(&text, " ").into_owned();
    }
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    normalize_text(&text)
}

/// Normalize a DOI as returned by a backend.
///
/// Resolver prefixes are removed and arXiv DOIs (`10.48550/arXiv.XXXX.YYYYY`)
/// are reduced to the bare arXiv identifier.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "doi:"]
        .iter()
        .find_map(|prefix| {
            trimmed
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &trimmed[prefix.len()..])
        })
        .unwrap_or(trimmed);

    match arxiv_doi().and_then(|re| re.captures(without_prefix)) {
        Some(caps) => caps[1].to_string(),
        None => without_prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("  Deep\nResidual\t\tLearning \x07for  Image\r\nRecognition "),
            "Deep Residual Learning for Image Recognition"
        );
        assert_eq!(normalize_text("\n\n"), "");
    }

    #[test]
    fn test_invalid_pattern_disables_step() {
        static BROKEN: OnceLock<Option<Regex>> = OnceLock::new();
        assert!(cached_regex(&BROKEN, r"(unclosed").is_none());
        assert!(cached_regex(&BROKEN, r"(unclosed").is_none());
    }

    #[test]
    fn test_strip_jats_markup() {
        let raw = "<jats:title>Abstract</jats:title><jats:p>We present a <jats:italic>new</jats:italic> method &amp; results.</jats:p>";
        assert_eq!(strip_markup(raw), "We present a new method & results.");
    }

    #[test]
    fn test_strip_markup_plain_text_untouched() {
        assert_eq!(strip_markup("Plain abstract text."), "Plain abstract text.");
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("https://doi.org/10.1038/nature14539"), "10.1038/nature14539");
        assert_eq!(normalize_identifier("10.48550/arXiv.1706.03762"), "1706.03762");
        assert_eq!(normalize_identifier("10.48550/ARXIV.2301.12345v2"), "2301.12345v2");
        assert_eq!(normalize_identifier(" 10.1145/3292500.3330701 "), "10.1145/3292500.3330701");
    }
}
