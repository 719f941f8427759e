//! Normalization of pavilion names coming from free-text spreadsheet cells.
//!
//! Location strings arrive in many shapes: annotated names ("Г21/1 (2 этаж)"),
//! power suffixes ("Е11/1 5квт"), shared meters ("Общий Г11/1, Г10/111/6 (+)")
//! and sibling lists ("Е10/1,2"). This module turns one raw location string
//! into the list of canonical pavilion-name candidates to look up.
//!
//! The space-suffix rule is a heuristic: a name is truncated at the first
//! space only when the leading token ends in a digit, so "Е11/1 5квт" becomes
//! "Е11/1" while "Пассаж 61" stays intact. Best effort, not bulletproof.

/// Marker word for a meter shared between pavilions. Only the first listed
/// pavilion gets the reading attributed to it.
const SHARED_METER_MARKER: &str = "общий ";

/// Removes all whitespace from a name ("Пассаж 61" -> "Пассаж61").
pub fn collapse_whitespace(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalizes a single pavilion name:
/// - drops a parenthesized annotation: "Г21/1 (2 этаж)" -> "Г21/1"
/// - drops a suffix after a digit-terminated token: "Е11/1 5квт" -> "Е11/1"
pub fn normalize_single_name(name: &str) -> String {
    let mut base = name.trim();

    if let Some(idx) = base.find(" (") {
        base = base[..idx].trim_end();
    }

    if let Some((before_space, _)) = base.split_once(' ') {
        if before_space.ends_with(|c: char| c.is_ascii_digit()) {
            return before_space.to_string();
        }
    }

    base.to_string()
}

/// Splits a trailing digit run off a name when it follows a separator,
/// e.g. "Е10/1" -> ("Е10/", "1"). Returns the whitespace-stripped prefix.
fn split_trailing_number(name: &str) -> Option<(String, &str)> {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let (prefix, digits) = name.split_at(digits_start);
    if digits.is_empty() || !prefix.trim_end().ends_with('/') {
        return None;
    }

    Some((collapse_whitespace(prefix), digits))
}

/// Expands a raw location string into an ordered list of normalized pavilion
/// names. Single pass, order preserved, may be empty for blank input.
///
/// Examples:
/// - "Общий Г11/1, Г10/111/6 (+)" -> ["Г11/1"]
/// - "Е10/1,2"                    -> ["Е10/1", "Е10/2"]
/// - "Г9/1, Д10/1, Д12/1"         -> ["Г9/1", "Д10/1", "Д12/1"]
/// - "Пассаж 61"                  -> ["Пассаж 61", "Пассаж61"]
pub fn expand_location_to_pavilion_names(location: &str) -> Vec<String> {
    let mut base = location.trim().to_string();
    if base.is_empty() {
        return Vec::new();
    }

    // "Общий X, Y (...)": strip the marker and keep only the first pavilion
    if base.to_lowercase().starts_with(SHARED_METER_MARKER) {
        let marker_len = SHARED_METER_MARKER.chars().count();
        base = base.chars().skip(marker_len).collect::<String>();
        base = base.trim().to_string();
        if let Some(idx) = base.find(',') {
            base = base[..idx].trim().to_string();
        }
    }

    // No commas: return the normalized name and its collapsed variant
    if !base.contains(',') {
        let normalized = normalize_single_name(&base);
        let collapsed = collapse_whitespace(&normalized);
        if normalized == collapsed {
            return vec![normalized];
        }
        return vec![normalized, collapsed];
    }

    let parts: Vec<&str> = base
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Vec::new();
    }

    let first = normalize_single_name(parts[0]);

    // "Е10/1, 2": the first part carries a prefix shared by bare numbers
    if let Some((prefix, _)) = split_trailing_number(&first) {
        let mut result = vec![first];
        for part in &parts[1..] {
            if part.chars().all(|c| c.is_ascii_digit()) {
                result.push(format!("{}{}", prefix, part));
            } else {
                result.push(normalize_single_name(part));
            }
        }
        return result;
    }

    // Heterogeneous list: every part is an independent full name
    parts.iter().map(|p| normalize_single_name(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_parenthesized_annotation() {
        assert_eq!(normalize_single_name("Г21/1 (2 этаж)"), "Г21/1");
    }

    #[test]
    fn test_normalize_drops_power_suffix() {
        assert_eq!(normalize_single_name("Е11/1 5квт"), "Е11/1");
    }

    #[test]
    fn test_normalize_keeps_word_names() {
        // First token does not end in a digit, so nothing is truncated
        assert_eq!(normalize_single_name("Пассаж 61"), "Пассаж 61");
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_single_name("  Е11/1  "), "Е11/1");
    }

    #[test]
    fn test_expand_shared_meter_keeps_first_pavilion() {
        assert_eq!(
            expand_location_to_pavilion_names("Общий Г11/1, Г10/111/6 (+)"),
            vec!["Г11/1"]
        );
        assert_eq!(
            expand_location_to_pavilion_names("Общий В18/5, В18/519/7"),
            vec!["В18/5"]
        );
    }

    #[test]
    fn test_expand_sibling_numbers_share_prefix() {
        assert_eq!(
            expand_location_to_pavilion_names("Е10/1,2"),
            vec!["Е10/1", "Е10/2"]
        );
        assert_eq!(
            expand_location_to_pavilion_names("Е11/5,6"),
            vec!["Е11/5", "Е11/6"]
        );
    }

    #[test]
    fn test_expand_heterogeneous_list() {
        assert_eq!(
            expand_location_to_pavilion_names("Г9/1, Д10/1, Д12/1"),
            vec!["Г9/1", "Д10/1", "Д12/1"]
        );
    }

    #[test]
    fn test_expand_single_name_with_suffix() {
        assert_eq!(expand_location_to_pavilion_names("Е11/1 5квт"), vec!["Е11/1"]);
    }

    #[test]
    fn test_expand_word_name_returns_both_variants() {
        assert_eq!(
            expand_location_to_pavilion_names("Пассаж 61"),
            vec!["Пассаж 61", "Пассаж61"]
        );
    }

    #[test]
    fn test_expand_mixed_list_with_full_name_override() {
        assert_eq!(
            expand_location_to_pavilion_names("Е10/1, 2, Д12/1"),
            vec!["Е10/1", "Е10/2", "Д12/1"]
        );
    }

    #[test]
    fn test_expand_empty_input() {
        assert!(expand_location_to_pavilion_names("").is_empty());
        assert!(expand_location_to_pavilion_names("   ").is_empty());
    }
}
