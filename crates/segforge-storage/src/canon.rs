//! The canon context store: an append-only, index-tagged text log used as a
//! sliding-window memory across per-segment LLM calls.
//!
//! Wire format and every function here are grounded on
//! `original_source/src/autosedance/utils/canon.py`. No regex crate is used:
//! the two recognized prefixes (`[#IDX=<n>]` and the legacy `片段N(`) are
//! simple enough to parse with plain string scanning.

pub const CANON_SUMMARY_MARKER: &str = "[[CANON_SUMMARY]]";
pub const MUSIC_STATE_MARKER: &str = "[[MUSIC_STATE]]";

const SEPARATOR: &str = "\n---\n";

/// Split a canon blob into its individual items, discarding empty entries.
pub fn split_canon(canon: &str) -> Vec<String> {
    canon
        .split(SEPARATOR)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn join_canon(items: &[String]) -> String {
    items.join(SEPARATOR)
}

/// Parse the leading `[#IDX=<n>]` token, falling back to the legacy `片段N(`
/// marker. Returns `None` when neither is present (the item is preserved by
/// callers rather than dropped, to avoid losing data from older formats).
pub fn parse_idx(item: &str) -> Option<i64> {
    parse_idx_token(item).or_else(|| parse_idx_legacy(item))
}

fn parse_idx_token(item: &str) -> Option<i64> {
    let rest = item.strip_prefix("[#IDX=")?;
    let end = rest.find(']')?;
    rest[..end].parse().ok()
}

fn parse_idx_legacy(item: &str) -> Option<i64> {
    let rest = item.strip_prefix("片段")?;
    let end = rest.find('(')?;
    rest[..end].parse().ok()
}

/// The last `keep` items, re-joined.
pub fn canon_recent(canon: &str, keep: usize) -> String {
    let items = split_canon(canon);
    let start = items.len().saturating_sub(keep);
    join_canon(&items[start..])
}

/// Append `item` to `canon`. A no-op (returns `canon` trimmed) when `item` is
/// empty; no leading separator when `canon` is empty.
pub fn append(canon: &str, item: &str) -> String {
    let item = item.trim();
    if item.is_empty() {
        return canon.trim().to_string();
    }
    if canon.trim().is_empty() {
        return item.to_string();
    }
    format!("{}{}{}", canon.trim(), SEPARATOR, item)
}

/// Items with IDX strictly less than `index`. Items without a recognizable
/// IDX are kept (forward-compat / no data loss).
pub fn before_index(canon: &str, index: i64) -> String {
    let items: Vec<String> = split_canon(canon)
        .into_iter()
        .filter(|item| match parse_idx(item) {
            Some(idx) => idx < index,
            None => true,
        })
        .collect();
    join_canon(&items)
}

/// Replace the first item with IDX == `index`, else append `new_item`.
/// Empty items are filtered out of the result.
pub fn replace_by_index(canon: &str, index: i64, new_item: &str) -> String {
    let mut items = split_canon(canon);
    let pos = items.iter().position(|item| parse_idx(item) == Some(index));
    match pos {
        Some(i) => items[i] = new_item.trim().to_string(),
        None => items.push(new_item.trim().to_string()),
    }
    join_canon(&items.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>())
}

/// Extract the content of a line beginning with `marker`, two-pass: a strict
/// line-start match first, then a scan tolerant of a leading bullet prefix
/// (`-`, `*`, `•`). Strips a leading `:` and surrounding whitespace from the
/// remainder.
pub fn extract_marker_line(text: &str, marker: &str) -> Option<String> {
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(strip_marker_remainder(rest));
        }
    }
    for line in text.lines() {
        let trimmed = line.trim();
        let without_bullet = trimmed
            .trim_start_matches(['-', '*', '•'])
            .trim_start();
        if let Some(rest) = without_bullet.strip_prefix(marker) {
            return Some(strip_marker_remainder(rest));
        }
    }
    None
}

fn strip_marker_remainder(rest: &str) -> String {
    rest.trim_start_matches(':').trim().to_string()
}

/// A compact, human-scannable description used in canon summaries: prefers a
/// `[[CANON_SUMMARY]]` marker line, else the first non-empty line, else the
/// whole text; collapses internal whitespace and ellipsizes to `max_chars`.
pub fn compact_description(description: &str, max_chars: usize) -> String {
    let base = extract_marker_line(description, CANON_SUMMARY_MARKER)
        .filter(|s| !s.is_empty())
        .or_else(|| description.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string))
        .unwrap_or_else(|| description.trim().to_string());

    let collapsed = base.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

/// `[#IDX=<n>] #<NNN+1> (<start>s-<end>s): <desc>` — omits the trailing
/// `: <desc>` when `description` is empty.
pub fn format_canon_summary(index: i64, start_s: i64, end_s: i64, description: &str) -> String {
    let head = format!("[#IDX={index}] #{:03} ({start_s}s-{end_s}s)", index + 1);
    if description.trim().is_empty() {
        head
    } else {
        format!("{head}: {}", description.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_skips_separator_on_empty_canon() {
        assert_eq!(append("", "first item"), "first item");
        assert_eq!(append("  ", "first item"), "first item");
    }

    #[test]
    fn append_is_noop_for_empty_item() {
        assert_eq!(append("existing", ""), "existing");
        assert_eq!(append("existing", "   "), "existing");
    }

    #[test]
    fn append_joins_with_separator() {
        assert_eq!(append("a", "b"), "a\n---\nb");
    }

    #[test]
    fn recent_returns_last_x_associatively() {
        let canon = append(&append("a", "b"), "c");
        assert_eq!(canon_recent(&canon, 1), "c");
        assert_eq!(canon_recent(&canon, 2), "b\n---\nc");
    }

    #[test]
    fn before_index_keeps_lower_idx_and_unparseable_items() {
        let a = format_canon_summary(0, 0, 15, "first");
        let b = format_canon_summary(1, 15, 30, "second");
        let canon = append(&append("legacy note", &a), &b);

        let trimmed = before_index(&canon, 1);
        assert!(trimmed.contains("legacy note"));
        assert!(trimmed.contains("#IDX=0"));
        assert!(!trimmed.contains("#IDX=1"));
    }

    #[test]
    fn replace_by_index_replaces_matching_item_else_appends() {
        let a = format_canon_summary(0, 0, 15, "first");
        let canon = replace_by_index("", 0, &a);
        let updated = format_canon_summary(0, 0, 15, "updated");
        let replaced = replace_by_index(&canon, 0, &updated);
        assert_eq!(split_canon(&replaced).len(), 1);
        assert!(replaced.contains("updated"));

        let b = format_canon_summary(1, 15, 30, "second");
        let appended = replace_by_index(&replaced, 1, &b);
        assert_eq!(split_canon(&appended).len(), 2);
    }

    #[test]
    fn compact_description_prefers_marker_then_first_line_then_ellipsizes() {
        let with_marker = "some preamble\n[[CANON_SUMMARY]]: a tight summary\nmore text";
        assert_eq!(compact_description(with_marker, 240), "a tight summary");

        let without_marker = "  first line  \nsecond line";
        assert_eq!(compact_description(without_marker, 240), "first line");

        let long = "a".repeat(300);
        let compacted = compact_description(&long, 240);
        assert_eq!(compacted.chars().count(), 240);
        assert!(compacted.ends_with('…'));
    }

    #[test]
    fn format_canon_summary_matches_wire_format() {
        assert_eq!(
            format_canon_summary(0, 0, 15, "a cat jumps"),
            "[#IDX=0] #001 (0s-15s): a cat jumps"
        );
        assert_eq!(format_canon_summary(2, 30, 45, ""), "[#IDX=2] #003 (30s-45s)");
    }
}
