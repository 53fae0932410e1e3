//! Client for the external media storage service.
//!
//! Uploads happen before any row referencing the asset is created, so a
//! failed upload never leaves a dangling reference in the database.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use url::Url;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A stored media asset as reported by the media service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub url: String,
    /// Playback length in seconds, present for video uploads only.
    pub duration: Option<f64>,
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub result: String,
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    url: &'a str,
}

/// Media storage collaborator.
///
/// Boxed futures keep the trait object-safe so handlers can be exercised
/// against a stub in tests.
pub trait MediaStore: Send + Sync + 'static {
    fn upload<'a>(
        &'a self,
        source: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<MediaAsset>> + Send + 'a>>;

    fn delete<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<DeleteOutcome>> + Send + 'a>>;
}

pub type SharedMediaStore = Arc<dyn MediaStore>;

/// HTTP implementation talking to the media storage service.
pub struct HttpMediaStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMediaStore {
    /// Build a client for the media service at `base_url`.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid media service URL")?;
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build media client")?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .context("failed to build media endpoint URL")
    }

    async fn do_upload(&self, source: &str) -> Result<MediaAsset> {
        let endpoint = self.endpoint("upload")?;
        let response = self
            .client
            .post(endpoint)
            .json(&UploadRequest { source })
            .send()
            .await
            .context("media upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("media upload failed with status {status}"));
        }

        response
            .json::<MediaAsset>()
            .await
            .context("failed to decode media upload response")
    }

    async fn do_delete(&self, url: &str) -> Result<DeleteOutcome> {
        let endpoint = self.endpoint("delete")?;
        let response = self
            .client
            .post(endpoint)
            .json(&DeleteRequest { url })
            .send()
            .await
            .context("media delete request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("media delete failed with status {status}"));
        }

        response
            .json::<DeleteOutcome>()
            .await
            .context("failed to decode media delete response")
    }
}

impl MediaStore for HttpMediaStore {
    fn upload<'a>(
        &'a self,
        source: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<MediaAsset>> + Send + 'a>> {
        Box::pin(self.do_upload(source))
    }

    fn delete<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<DeleteOutcome>> + Send + 'a>> {
        Box::pin(self.do_delete(url))
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::{DeleteOutcome, MediaAsset, MediaStore};
    use anyhow::{anyhow, Result};
    use std::{future::Future, pin::Pin, sync::Mutex};

    /// In-memory stand-in for the media service. Records deleted URLs so
    /// tests can assert on cleanup behavior.
    pub(crate) struct StubMediaStore {
        pub(crate) fail_uploads: bool,
        pub(crate) deleted: Mutex<Vec<String>>,
    }

    impl StubMediaStore {
        pub(crate) fn new(fail_uploads: bool) -> Self {
            Self {
                fail_uploads,
                deleted: Mutex::new(Vec::new()),
            }
        }
    }

    impl MediaStore for StubMediaStore {
        fn upload<'a>(
            &'a self,
            source: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<MediaAsset>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail_uploads {
                    return Err(anyhow!("stub upload failure"));
                }
                Ok(MediaAsset {
                    url: format!("https://media.test/{source}"),
                    duration: None,
                })
            })
        }

        fn delete<'a>(
            &'a self,
            url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<DeleteOutcome>> + Send + 'a>> {
            Box::pin(async move {
                self.deleted
                    .lock()
                    .expect("stub delete log")
                    .push(url.to_string());
                Ok(DeleteOutcome {
                    result: "ok".to_string(),
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubMediaStore;
    use super::*;

    #[test]
    fn new_rejects_invalid_url() {
        assert!(HttpMediaStore::new("not a url").is_err());
    }

    #[test]
    fn endpoint_joins_base_url() -> Result<()> {
        let store = HttpMediaStore::new("http://localhost:9000/")?;
        let endpoint = store.endpoint("upload")?;
        assert_eq!(endpoint.as_str(), "http://localhost:9000/upload");
        Ok(())
    }

    #[tokio::test]
    async fn stub_upload_returns_asset() -> Result<()> {
        let store: SharedMediaStore = Arc::new(StubMediaStore::new(false));
        let asset = store.upload("avatar.png").await?;
        assert_eq!(asset.url, "https://media.test/avatar.png");
        assert!(asset.duration.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn stub_upload_failure_propagates() {
        let store: SharedMediaStore = Arc::new(StubMediaStore::new(true));
        assert!(store.upload("avatar.png").await.is_err());
    }

    #[tokio::test]
    async fn stub_records_deletes() -> Result<()> {
        let stub = Arc::new(StubMediaStore::new(false));
        let store: SharedMediaStore = stub.clone();
        store.delete("https://media.test/avatar.png").await?;
        let deleted = stub.deleted.lock().expect("stub delete log");
        assert_eq!(deleted.as_slice(), ["https://media.test/avatar.png"]);
        Ok(())
    }
}
