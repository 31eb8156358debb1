//! HTML stripping and whitespace normalization.

use std::sync::OnceLock;

use regex::Regex;

const BLOCK_CLOSE_TAGS: &[&str] = &["p", "div", "section", "article", "li", "tr", "td", "th"];

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</\1>").unwrap()
    })
}

fn br_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").unwrap())
}

fn block_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    RE.get_or_init(|| {
        let mut tags: Vec<String> = BLOCK_CLOSE_TAGS.to_vec().into_iter().map(String::from).collect();
        tags.extend(["h1", "h2", "h3", "h4", "h5", "h6"].iter().map(|s| (*s).to_string()));
        let alternation = tags.join("|");
        Regex::new(&format!(r"(?i)</({alternation})\s*>")).unwrap()
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Strip HTML markup from `raw`, decode entities, and normalize whitespace
/// while preserving logical line breaks, so downstream stages (splitter,
/// semantic extractor) see one job-relevant line per output line.
pub fn clean(raw: &str) -> String {
    let no_scripts = script_style_re().replace_all(raw, "");
    let with_line_breaks = br_re().replace_all(&no_scripts, "\n");
    let with_block_breaks = block_close_re().replace_all(&with_line_breaks, "\n");
    let no_tags = tag_re().replace_all(&with_block_breaks, "");
    let decoded = html_escape::decode_html_entities(&no_tags);
    let normalized_newlines = decoded.replace("\r\n", "\n").replace('\r', "\n");

    normalized_newlines
        .lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(line: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    let re = WS.get_or_init(|| Regex::new(r"[ \t\u{3000}]+").unwrap());
    re.replace_all(line.trim(), " ").trim().to_string()
}
