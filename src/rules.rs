use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Time-shift variants at the end of a name: "+1", "+4 HD", "+2 (Москва)".
    static ref TIME_SHIFT: Regex =
        Regex::new(r"(?i)\s\+\d+(?:\s+HD)?(?:\s*\([^)]+\))?\s*$").unwrap();
    /// Names ending in a standalone number of two or more digits ("Channel 50").
    /// Single digits are often part of the actual channel name and stay.
    static ref TRAILING_NUMBER: Regex = Regex::new(r"\s\d{2,}$").unwrap();
    /// Quality/version tokens removed when computing a base name, longest first
    /// so "full hd" is consumed as one token.
    static ref QUALITY_TOKEN: Regex =
        Regex::new(r"(?i)\b(?:full\s+hd|uhd\s+tv|uhd|4k|hd|sd|orig)\b").unwrap();
}

/// Name-matching rules applied to each whitelisted channel. The exclusion
/// patterns default to the time-shift and trailing-number rules but can be
/// replaced wholesale from configuration.
#[derive(Debug, Clone)]
pub struct NamePolicy {
    exclude_substrings: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            exclude_substrings: Vec::new(),
            exclude_patterns: vec![TIME_SHIFT.clone(), TRAILING_NUMBER.clone()],
        }
    }
}

impl NamePolicy {
    pub fn new(exclude_substrings: Vec<String>, exclude_patterns: Vec<Regex>) -> Self {
        Self {
            exclude_substrings: exclude_substrings
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            exclude_patterns,
        }
    }

    pub fn with_substrings(exclude_substrings: Vec<String>) -> Self {
        Self::new(
            exclude_substrings,
            vec![TIME_SHIFT.clone(), TRAILING_NUMBER.clone()],
        )
    }

    /// True when the channel must be dropped regardless of its category.
    pub fn excludes(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        if self.exclude_substrings.iter().any(|p| lowered.contains(p)) {
            return true;
        }
        self.exclude_patterns.iter().any(|re| re.is_match(name))
    }
}

/// Remove a trailing " orig" token (case-insensitive). "Orig Channel" and
/// "Channel orig extra" are left alone.
pub fn strip_orig_suffix(name: &str) -> &str {
    match name.char_indices().rev().nth(4) {
        Some((idx, _)) if name[idx..].eq_ignore_ascii_case(" orig") => &name[..idx],
        _ => name,
    }
}

/// True when the display name carries an HD marker.
pub fn is_hd_variant(name: &str) -> bool {
    name.to_lowercase().contains(" hd")
}

/// Base name used to group HD/non-HD variants of the same channel:
/// lowercased, quality tokens removed, whitespace collapsed.
pub fn base_channel_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = QUALITY_TOKEN.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
