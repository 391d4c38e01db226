//! Download of yearly landing archives.
//!
//! The register publishes one zipped, semicolon-separated export per year. The fetcher
//! downloads it with a bounded timeout, takes the enclosed `.csv` file and returns its bytes for
//! [`crate::pipeline::run_bytes`]. Failures are surfaced, never retried.

use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};

/// Default archive location; `{year}` is substituted.
pub const DEFAULT_URL_TEMPLATE: &str = "https://register.fiskeridir.no/uttrekk/fangstdata_{year}.csv.zip";

/// Options for [`RemoteFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// URL with a `{year}` placeholder.
    pub url_template: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout_secs: 120,
        }
    }
}

impl FetchOptions {
    /// Archive URL for `year`.
    pub fn url_for(&self, year: i32) -> String {
        self.url_template.replace("{year}", &year.to_string())
    }
}

/// A delimited file taken out of a downloaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// URL the archive was downloaded from.
    pub url: String,
    /// Name of the entry inside the archive.
    pub entry_name: String,
    /// Raw entry bytes, encoding still unknown.
    pub bytes: Vec<u8>,
}

/// Blocking HTTP client for yearly archives.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: Client,
    options: FetchOptions,
}

impl RemoteFetcher {
    pub fn new(options: FetchOptions) -> IngestionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Download the archive for `year` and extract its delimited file.
    pub fn fetch_year(&self, year: i32) -> IngestionResult<FetchedFile> {
        let url = self.options.url_for(year);
        tracing::info!(url = %url, year, "downloading archive");

        let resp = self.client.get(&url).send()?.error_for_status()?;
        let body = resp.bytes()?;
        tracing::info!(url = %url, size_mb = body.len() as f64 / 1024.0 / 1024.0, "downloaded");

        let (entry_name, bytes) = extract_delimited_file(&body, &url)?;
        Ok(FetchedFile { url, entry_name, bytes })
    }
}

/// Return the first entry whose name ends with `.csv` (case-insensitive).
///
/// `source` labels the error when no such entry exists.
pub fn extract_delimited_file(archive: &[u8], source: &str) -> IngestionResult<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_file() && name.to_lowercase().ends_with(".csv") {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            tracing::debug!(entry = %name, bytes = bytes.len(), "extracted archive entry");
            return Ok((name, bytes));
        }
    }
    Err(IngestionError::Archive {
        path: PathBuf::from(source),
        message: "no .csv entry in archive".to_string(),
    })
}
