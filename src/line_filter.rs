//! Rule-driven removal of greetings, signatures, and boilerplate lines.

use regex::Regex;

use crate::config::types::LineFilterConfig;

/// Compiled, once-per-config-snapshot form of [`LineFilterConfig`]. Invalid
/// patterns are silently dropped, matching the rest of this crate's
/// regex-config handling.
pub struct CompiledLineFilter {
    decoration_chars: Vec<char>,
    greeting: Vec<Regex>,
    closing: Vec<Regex>,
    company_prefix: Vec<String>,
    signature_keywords: Vec<String>,
    footer: Vec<Regex>,
    job_keywords: Vec<String>,
    force_delete: Vec<Regex>,
}

fn compile_all(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
        .collect()
}

impl CompiledLineFilter {
    pub fn new(config: &LineFilterConfig) -> Self {
        Self {
            decoration_chars: config.decoration_chars.chars().collect(),
            greeting: compile_all(&config.greeting_patterns),
            closing: compile_all(&config.closing_patterns),
            company_prefix: config.signature_company_prefix.clone(),
            signature_keywords: config.signature_keywords.clone(),
            footer: compile_all(&config.footer_patterns),
            job_keywords: config.job_keywords.clone(),
            force_delete: compile_all(&config.force_delete_patterns),
        }
    }

    fn is_force_delete(&self, line: &str) -> bool {
        self.force_delete.iter().any(|re| re.is_match(line))
    }

    fn has_job_keyword(&self, line: &str) -> bool {
        self.job_keywords.iter().any(|kw| line.contains(kw.as_str()))
    }

    fn is_decorative(&self, trimmed: &str) -> bool {
        let stripped: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() {
            return false;
        }
        if stripped.chars().all(|c| self.decoration_chars.contains(&c)) {
            return true;
        }
        if let Some(first) = stripped.chars().next() {
            if stripped.chars().count() >= 3 && !first.is_alphanumeric() && stripped.chars().all(|c| c == first) {
                return true;
            }
        }
        false
    }

    fn is_short_noise(&self, trimmed: &str) -> bool {
        trimmed.chars().count() <= 4
            && !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_punctuation() || c == '_')
    }

    fn is_signature_like(&self, line: &str) -> bool {
        static EMAIL: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        static URL: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        static PHONE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        #[allow(clippy::unwrap_used)]
        let email_re =
            EMAIL.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap());
        #[allow(clippy::unwrap_used)]
        let url_re = URL.get_or_init(|| Regex::new(r"(?i)(https?://|www\.)|\bURL\s*:").unwrap());
        #[allow(clippy::unwrap_used)]
        let phone_re = PHONE.get_or_init(|| Regex::new(r"\d{2,4}-\d{2,4}-\d{3,4}").unwrap());

        if email_re.is_match(line) || url_re.is_match(line) || phone_re.is_match(line) {
            return true;
        }
        if self
            .signature_keywords
            .iter()
            .any(|kw| line.contains(kw.as_str()))
        {
            return true;
        }
        self.company_prefix
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }

    fn is_garbage(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        self.is_decorative(trimmed)
            || self.is_short_noise(trimmed)
            || self.greeting.iter().any(|re| re.is_match(line))
            || self.closing.iter().any(|re| re.is_match(line))
            || self.footer.iter().any(|re| re.is_match(line))
            || self.is_signature_like(line)
    }

    /// Apply the keep/drop rules to `lines` in order: force-delete, then
    /// job-keyword override, then garbage rejection.
    pub fn filter<'a>(&self, lines: &[&'a str]) -> Vec<&'a str> {
        lines
            .iter()
            .filter(|line| {
                if self.is_force_delete(line) {
                    return false;
                }
                if self.has_job_keyword(line) {
                    return true;
                }
                !self.is_garbage(line)
            })
            .copied()
            .collect()
    }

    /// Apply [`CompiledLineFilter::filter`] to `body`'s lines and rejoin.
    pub fn filter_text(&self, body: &str) -> String {
        let lines: Vec<&str> = body.lines().collect();
        self.filter(&lines).join("\n")
    }
}

/// Filter `body`'s lines using `config`. When `enabled` is false, returns the
/// input unchanged.
pub fn filter_lines(body: &str, config: &LineFilterConfig, enabled: bool) -> String {
    if !enabled {
        return body.to_string();
    }
    let compiled = CompiledLineFilter::new(config);
    let lines: Vec<&str> = body.lines().collect();
    compiled.filter(&lines).join("\n")
}
