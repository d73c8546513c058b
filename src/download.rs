use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ProfileDbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificatePolicy {
    Verify,
    /// Some hosts serve their tables with a broken certificate chain.
    AcceptInvalid,
}

pub trait Downloader {
    fn download(
        &self,
        url: &str,
        destination: &Path,
        certificates: CertificatePolicy,
    ) -> Result<(), ProfileDbError>;
}

#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
    insecure_client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, ProfileDbError> {
        Ok(Self {
            client: build_client(timeout, false)?,
            insecure_client: build_client(timeout, true)?,
        })
    }
}

fn build_client(timeout: Duration, accept_invalid_certs: bool) -> Result<Client, ProfileDbError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("profile-dbs/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|err| ProfileDbError::Download {
            url: String::new(),
            message: err.to_string(),
        })
}

impl Downloader for HttpDownloader {
    fn download(
        &self,
        url: &str,
        destination: &Path,
        certificates: CertificatePolicy,
    ) -> Result<(), ProfileDbError> {
        let client = match certificates {
            CertificatePolicy::Verify => &self.client,
            CertificatePolicy::AcceptInvalid => &self.insecure_client,
        };
        tracing::debug!(url, destination = %destination.display(), "downloading");

        let mut response = client
            .get(url)
            .send()
            .map_err(|err| ProfileDbError::Download {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ProfileDbError::DownloadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        }
        let file =
            File::create(destination).map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        let mut writer = BufWriter::new(file);
        response
            .copy_to(&mut writer)
            .map_err(|err| ProfileDbError::Download {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        writer
            .flush()
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
