use std::collections::HashSet;

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Drop repeated entries, keeping the first occurrence of each.
pub fn dedupe_preserving_order(items: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            kept.push(item);
        } else {
            dropped.push(item);
        }
    }
    (kept, dropped)
}

/// Treat whitespace-only values as unset.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
