use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

/// S3-compatible storage target. Deserialized from the `[s3]` settings
/// section; defaults mirror a stock AWS setup.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_endpoint() -> String {
    "https://s3.amazonaws.com".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket() -> String {
    "your-bucket-name".to_string()
}

fn default_key() -> String {
    "playlist.m3u".to_string()
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            bucket: default_bucket(),
            key: default_key(),
        }
    }
}

impl S3Config {
    /// Full URL for a key (path-style: bucket in the path, not the hostname).
    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint.trim_end_matches('/'), self.bucket, key)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    /// Standard AWS environment variables; `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        Some(Self {
            access_key_id,
            secret_access_key,
        })
    }
}

pub struct S3Storage {
    config: S3Config,
    credentials: Credentials,
    client: Client,
}

impl S3Storage {
    pub fn new(config: S3Config, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client for S3 storage")?;

        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    /// Upload `body` under `key`, signed with AWS Signature V4.
    pub async fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<()> {
        info!(
            "Uploading to S3-compatible storage: s3://{}/{}",
            self.config.bucket, key
        );

        let payload_hash = sha256_hex(body);
        let now = chrono::Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let authorization = self
            .auth_header("PUT", key, &amz_date, &date_stamp, &payload_hash)
            .context("Failed to create authorization header for upload")?;

        let response = self
            .client
            .put(self.config.object_url(key))
            .header(header::AUTHORIZATION, authorization)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date)
            .body(body.to_vec())
            .send()
            .await
            .context("Failed to send upload request to S3-compatible storage")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("S3 upload failed: {} - {}", status, body);
        }

        info!("Upload to S3-compatible storage completed successfully");
        Ok(())
    }

    /// AWS Signature V4 authorization header for a request with the
    /// `host`, `x-amz-content-sha256` and `x-amz-date` headers signed.
    fn auth_header(
        &self,
        method: &str,
        key: &str,
        amz_date: &str,
        date_stamp: &str,
        payload_hash: &str,
    ) -> Result<String> {
        let object_url = self.config.object_url(key);
        let parsed = url::Url::parse(&object_url).context("Failed to parse object URL")?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => anyhow::bail!("No host in endpoint URL"),
        };
        let canonical_uri = parsed.path();

        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", self.credentials.secret_access_key).as_bytes(),
            date_stamp.as_bytes(),
        );
        let k_region = hmac_sha256(&k_date, self.config.region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        Ok(format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.credentials.access_key_id, credential_scope, signed_headers, signature
        ))
    }
}

/// Write the playlist into the output directory, creating it if needed.
pub fn save_local(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(filename);
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let size_kb = content.len() as f64 / 1024.0;
    info!(
        "M3U saved locally as {} (size: {:.2} KB)",
        path.display(),
        size_kb
    );
    Ok(path)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::{Hmac, Mac};

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
