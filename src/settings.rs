use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::playlist::{FilterPolicy, DEFAULT_MAX_INPUT_BYTES};
use crate::rules::NamePolicy;
use crate::storage::S3Config;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_source_url() -> String {
    "https://your-provider.com/playlist.m3u".to_string()
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_INPUT_BYTES
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            max_bytes: default_max_bytes(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterConfig {
    /// Category whitelist; an empty list keeps no channels.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Case-insensitive substrings that drop a channel by name.
    #[serde(default)]
    pub exclude_names: Vec<String>,
    /// Regex table replacing the built-in time-shift/trailing-number rules.
    #[serde(default)]
    pub exclude_patterns: Option<Vec<String>>,
    /// When set, rewrites the `url-tvg` attribute on the playlist header.
    #[serde(default)]
    pub epg_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            dry_run: false,
        }
    }
}

impl Settings {
    /// Collect every configuration problem instead of failing on the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !is_http_url(&self.source.url) {
            errors.push("source.url must be a valid HTTP/HTTPS URL".to_string());
        }
        if self.s3.bucket.len() < 3 || self.s3.bucket.len() > 63 {
            errors.push("s3.bucket must be between 3 and 63 characters".to_string());
        }
        if self.s3.key.is_empty() || self.s3.key.contains("..") || self.s3.key.starts_with('/') {
            errors.push("s3.key must not be empty, contain '..' or start with '/'".to_string());
        }
        if !is_http_url(&self.s3.endpoint) {
            errors.push("s3.endpoint must be a valid HTTP/HTTPS URL".to_string());
        }
        if self.s3.region.is_empty() {
            errors.push("s3.region must be specified".to_string());
        }

        errors
    }

    /// Key for the unfiltered companion playlist: `playlist.m3u` -> `playlist-all.m3u`.
    pub fn all_categories_key(&self) -> String {
        match self.s3.key.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}-all.{ext}"),
            None => format!("{}-all", self.s3.key),
        }
    }

    /// Assemble the filter's explicit policy object from the settings.
    pub fn filter_policy(&self) -> Result<FilterPolicy> {
        let names = match &self.filter.exclude_patterns {
            Some(patterns) => {
                let mut compiled = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    compiled.push(
                        Regex::new(pattern)
                            .with_context(|| format!("Invalid exclude pattern: {pattern}"))?,
                    );
                }
                NamePolicy::new(self.filter.exclude_names.clone(), compiled)
            }
            None => NamePolicy::with_substrings(self.filter.exclude_names.clone()),
        };

        Ok(FilterPolicy {
            categories: self.filter.categories.clone(),
            names,
            max_input_bytes: self.source.max_bytes,
            epg_url: self.filter.epg_url.clone(),
        })
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
