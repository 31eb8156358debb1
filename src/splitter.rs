//! Marker-driven partition of a body into per-opportunity blocks.

use regex::Regex;

use crate::model::SplitBlock;

/// Split `body` into [`SplitBlock`]s using `marker_patterns`. A line is a
/// marker only if it matches one of `marker_patterns` and its index is
/// strictly between `skip_lines` and `total - skip_lines` — lines near
/// either edge of the body can never be markers, even if they match.
pub fn split(body: &str, marker_patterns: &[String], skip_lines: usize) -> Vec<SplitBlock> {
    let lines: Vec<&str> = body.lines().collect();
    let total = lines.len();

    let compiled: Vec<Regex> = marker_patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

    let markers: Vec<usize> = (0..total)
        .filter(|&i| i > skip_lines && i + skip_lines < total)
        .filter(|&i| compiled.iter().any(|re| re.is_match(lines[i])))
        .collect();

    if markers.is_empty() {
        let joined = lines.join("\n");
        let trimmed = joined.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![SplitBlock {
                text: trimmed.to_string(),
                start_line: 0,
                end_line: total.saturating_sub(1),
            }]
        };
    }

    let mut blocks = Vec::with_capacity(markers.len());
    for (idx, &start) in markers.iter().enumerate() {
        let end = markers.get(idx + 1).map_or(total, |&next| next) - 1;
        let text = lines[start..=end].join("\n");
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        blocks.push(SplitBlock {
            text: trimmed.to_string(),
            start_line: start,
            end_line: end,
        });
    }
    blocks
}
