use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use thiserror::Error;
use tracing::debug;

use crate::rules::{self, NamePolicy};

/// Default ceiling for playlist input, matching the download cap.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 100 * 1024 * 1024;

lazy_static! {
    static ref GROUP_TITLE: Regex = Regex::new(r#"(?i)group-title="([^"]*)""#).unwrap();
    static ref TVG_REC: Regex = Regex::new(r#"tvg-rec="(\d+)""#).unwrap();
    static ref URL_TVG: Regex = Regex::new(r#"(?i)url-tvg="[^"]*""#).unwrap();
}

/// One channel: a `#EXTINF` metadata line and the URL line that follows it.
#[derive(Debug, Clone)]
pub struct Entry {
    pub info: String,
    pub url: String,
}

impl Entry {
    /// Display name, i.e. everything after the final comma of the metadata line.
    pub fn name(&self) -> &str {
        self.info.rsplit_once(',').map(|(_, n)| n.trim()).unwrap_or("")
    }

    fn category(&self) -> Option<String> {
        GROUP_TITLE
            .captures(&self.info)
            .map(|c| c[1].to_lowercase())
    }

    fn tvg_rec(&self) -> u64 {
        TVG_REC
            .captures(&self.info)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0)
    }

    fn rename(self, name: &str) -> Entry {
        match self.info.rsplit_once(',') {
            Some((prefix, _)) => Entry {
                info: format!("{prefix},{name}"),
                url: self.url,
            },
            None => self,
        }
    }
}

/// Everything the filter needs, passed in explicitly per invocation.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    /// Categories to keep; membership is a case-insensitive exact match on
    /// `group-title`. An empty whitelist keeps no channels.
    pub categories: Vec<String>,
    pub names: NamePolicy,
    pub max_input_bytes: usize,
    /// Replaces (or adds) the `url-tvg` attribute on the header line.
    pub epg_url: Option<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            names: NamePolicy::default(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            epg_url: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("playlist is {size} bytes, exceeding the maximum allowed size of {limit} bytes")]
    Oversized { size: usize, limit: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub input_lines: usize,
    pub input_channels: usize,
    pub output_lines: usize,
    pub output_channels: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub playlist: String,
    pub stats: FilterStats,
}

/// Filter a raw M3U playlist down to the whitelisted categories, apply the
/// name rules, collapse HD/non-HD duplicates and return the rebuilt text
/// together with line/channel counts. Pure: no I/O, no shared state.
pub fn filter_playlist(content: &str, policy: &FilterPolicy) -> Result<FilterOutcome, FilterError> {
    if content.len() > policy.max_input_bytes {
        return Err(FilterError::Oversized {
            size: content.len(),
            limit: policy.max_input_bytes,
        });
    }

    let input_lines = content.lines().count();
    let (header, entries) = parse(content);
    let input_channels = entries.len();

    let whitelist: Vec<String> = policy.categories.iter().map(|c| c.to_lowercase()).collect();

    let mut kept: Vec<Entry> = Vec::new();
    for entry in entries {
        let Some(category) = entry.category() else {
            continue;
        };
        if !whitelist.contains(&category) {
            continue;
        }
        let name = entry.name().to_string();
        if policy.names.excludes(&name) {
            debug!("Excluding channel by name rule: {}", name);
            continue;
        }
        let stripped = rules::strip_orig_suffix(&name).to_string();
        kept.push(entry.rename(&stripped));
    }

    let survivors = dedupe(kept);

    let header_line = match header {
        Some(h) => rewrite_url_tvg(&h, policy.epg_url.as_deref()),
        None => "#EXTM3U".to_string(),
    };

    let mut lines = Vec::with_capacity(1 + survivors.len() * 2);
    lines.push(header_line);
    let output_channels = survivors.len();
    for entry in survivors {
        lines.push(entry.info);
        lines.push(entry.url);
    }
    let output_lines = lines.len();

    Ok(FilterOutcome {
        playlist: lines.join("\n"),
        stats: FilterStats {
            input_lines,
            input_channels,
            output_lines,
            output_channels,
        },
    })
}

/// Split raw text into the header line and well-formed metadata/URL pairs.
/// A metadata line must carry a display name after its final comma and be
/// followed by a URL line (other `#` directives in between are dropped, as
/// are URL lines with no pending metadata and metadata lines never paired).
fn parse(content: &str) -> (Option<String>, Vec<Entry>) {
    let mut header: Option<String> = None;
    let mut entries: Vec<Entry> = Vec::new();
    let mut pending: Option<String> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#EXTM3U") {
            if header.is_none() {
                header = Some(line.to_string());
            }
            pending = None;
        } else if line.starts_with("#EXTINF:") {
            pending = has_display_name(line).then(|| line.to_string());
        } else if line.starts_with('#') {
            // #EXTVLCOPT and friends are not part of the output format.
        } else if let Some(info) = pending.take() {
            entries.push(Entry {
                info,
                url: line.to_string(),
            });
        }
    }

    (header, entries)
}

fn has_display_name(info_line: &str) -> bool {
    info_line
        .rsplit_once(',')
        .is_some_and(|(_, name)| !name.trim().is_empty())
}

/// Group entries by base name in first-occurrence order and keep one variant
/// per group: HD beats non-HD, then the highest `tvg-rec` wins (first
/// occurrence on ties).
fn dedupe(entries: Vec<Entry>) -> Vec<Entry> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Entry>> = HashMap::new();

    for entry in entries {
        let base = rules::base_channel_name(entry.name());
        if !groups.contains_key(&base) {
            order.push(base.clone());
        }
        groups.entry(base).or_default().push(entry);
    }

    let mut survivors = Vec::with_capacity(order.len());
    for base in &order {
        let Some(variants) = groups.remove(base) else {
            continue;
        };
        survivors.push(pick_variant(base, variants));
    }
    survivors
}

fn pick_variant(base: &str, variants: Vec<Entry>) -> Entry {
    let has_hd = variants.iter().any(|e| rules::is_hd_variant(e.name()));
    let has_non_hd = variants.iter().any(|e| !rules::is_hd_variant(e.name()));

    let mut pool: Vec<Entry> = if has_hd && has_non_hd {
        let (hd, dropped): (Vec<Entry>, Vec<Entry>) = variants
            .into_iter()
            .partition(|e| rules::is_hd_variant(e.name()));
        for entry in &dropped {
            debug!("Removed non-HD version for '{}': {}", base, entry.name());
        }
        hd
    } else {
        variants
    };

    if pool.len() > 1 {
        let mut best = 0;
        for i in 1..pool.len() {
            if pool[i].tvg_rec() > pool[best].tvg_rec() {
                best = i;
            }
        }
        for (i, entry) in pool.iter().enumerate() {
            if i != best {
                debug!("Removed duplicate version for '{}': {}", base, entry.name());
            }
        }
        pool.swap_remove(best)
    } else {
        pool.remove(0)
    }
}

/// Replace the `url-tvg` attribute on the header line, or append it when the
/// header carries none.
fn rewrite_url_tvg(header: &str, epg_url: Option<&str>) -> String {
    let Some(epg_url) = epg_url else {
        return header.to_string();
    };
    let attr = format!(r#"url-tvg="{epg_url}""#);
    if URL_TVG.is_match(header) {
        URL_TVG.replace(header, NoExpand(&attr)).into_owned()
    } else if let Some(prefix) = header.strip_suffix('>') {
        format!("{prefix} {attr}>")
    } else {
        format!("{header} {attr}")
    }
}
