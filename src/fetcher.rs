//! Thin GET + JSON wrapper around the content API.

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Something that can resolve a resource path to a JSON body.
///
/// The SWR cache only knows about this trait, so tests can drive it with a
/// counting double instead of a live server.
pub trait Fetch: Send + Sync + 'static {
  fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Value, FetchError>>;
}

/// reqwest-backed fetcher bound to the API base URL.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpFetcher {
  pub fn new(base_url: Url) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url,
    }
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Issue a GET for `path` and parse the body as JSON.
  pub async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
    let url = build_url(&self.base_url, path)?;
    get_json(&self.client, url).await
  }
}

impl Fetch for HttpFetcher {
  fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Value, FetchError>> {
    let client = self.client.clone();
    let url = build_url(&self.base_url, path);
    Box::pin(async move { get_json(&client, url?).await })
  }
}

async fn get_json(client: &reqwest::Client, url: Url) -> Result<Value, FetchError> {
  debug!(%url, "GET");

  let response = client
    .get(url.clone())
    .send()
    .await
    .map_err(FetchError::Network)?;

  let status = response.status();
  if !status.is_success() {
    return Err(FetchError::Http {
      status: status.as_u16(),
      url: url.to_string(),
    });
  }

  let body = response.bytes().await.map_err(FetchError::Network)?;
  serde_json::from_slice(&body).map_err(FetchError::Parse)
}

/// Append `path` to the base URL, keeping any path prefix the base carries
/// (`http://host/api` + `/blogs` is `http://host/api/blogs`).
pub fn build_url(base: &Url, path: &str) -> Result<Url, FetchError> {
  let base = base.as_str().trim_end_matches('/');
  let joined = if path.starts_with('/') {
    format!("{}{}", base, path)
  } else {
    format!("{}/{}", base, path)
  };

  Url::parse(&joined).map_err(|source| FetchError::InvalidUrl {
    url: joined,
    source,
  })
}
