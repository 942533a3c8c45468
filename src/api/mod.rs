//! HTTP client for the download server.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

pub use types::{
    DownloadSummary, RejectedLink, ServerStatus, TitledItem, ValidatedLink, Validation,
    ValidationOutcome,
};

use crate::artifact::ArchiveBody;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::links::LinkSet;
use crate::reply::{DownloadReply, ReplyKind, error_message, is_structured};

/// The server operations a submission run depends on.
///
/// Each call is a single round trip; nothing here retries.
#[async_trait]
pub trait LinkService: Send + Sync {
    /// Asks the server to classify the links.
    ///
    /// A non-success status yields [`Validation::Unavailable`]; a transport
    /// failure yields [`Error::Transport`].
    async fn validate(&self, links: &LinkSet) -> Result<Validation>;

    /// Asks the server to download the links.
    ///
    /// A binary reply is returned before its body has been read.
    async fn download(&self, links: &LinkSet) -> Result<DownloadReply>;

    /// Fetches the archive produced by an earlier download.
    ///
    /// The status is checked before returning; the body streams afterwards.
    async fn fetch_archive(&self, session_id: &str) -> Result<ArchiveBody>;

    /// Reports whether the server is busy downloading.
    async fn status(&self) -> Result<ServerStatus>;
}

/// Builds a configured HTTP client for server requests.
fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(4)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// [`LinkService`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpLinkService {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpLinkService {
    /// Creates a service with a default pooled client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_client(build_http_client()?, config))
    }

    /// Creates a service around an existing client.
    #[must_use]
    pub const fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_links(&self, path: &str, links: &LinkSet) -> Result<reqwest::Response> {
        let url = self.config.endpoint(path);
        log::debug!("POST {url} with {} link(s)", links.len());
        self.http
            .post(&url)
            .multipart(links.to_form())
            .send()
            .await
            .map_err(|e| Error::transport(&e))
    }
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Converts a non-success response into [`Error::Server`].
async fn server_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let structured = is_structured(content_type(&response).as_deref());
    let message = match response.bytes().await {
        Ok(body) => error_message(status, structured, &body),
        Err(e) => {
            log::debug!("Could not read error body: {e}");
            format!("Server returned error (status {status})")
        }
    };
    Error::Server { status, message }
}

#[async_trait]
impl LinkService for HttpLinkService {
    async fn validate(&self, links: &LinkSet) -> Result<Validation> {
        let response = self.post_links("validate", links).await?;
        let status = response.status();
        if !status.is_success() {
            return Ok(Validation::Unavailable {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(Validation::Checked(serde_json::from_slice(&body)?))
    }

    async fn download(&self, links: &LinkSet) -> Result<DownloadReply> {
        let response = self.post_links("download", links).await?;
        let status = response.status().as_u16();
        let content_type = content_type(&response);
        if ReplyKind::classify(status, content_type.as_deref()) == ReplyKind::Binary {
            return Ok(DownloadReply::Binary(ArchiveBody::from_response(response)));
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) if !(200..300).contains(&status) => {
                log::debug!("Could not read error body: {e}");
                return Ok(DownloadReply::Error {
                    status,
                    message: format!("Server returned error (status {status})"),
                });
            }
            Err(e) => return Err(e.into()),
        };
        DownloadReply::parse(status, content_type.as_deref(), &body)
    }

    async fn fetch_archive(&self, session_id: &str) -> Result<ArchiveBody> {
        let mut url = reqwest::Url::parse(&self.config.endpoint("download_file"))
            .map_err(|e| Error::Config(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config("base URL cannot carry a path".to_string()))?
            .push(session_id);

        log::debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(ArchiveBody::from_response(response))
    }

    async fn status(&self) -> Result<ServerStatus> {
        let url = self.config.endpoint("status");
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
