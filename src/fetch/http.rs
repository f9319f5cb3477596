use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::header::{self, HeaderValue};
use reqwest::Client;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const ACCEPT_RDF: HeaderValue =
    HeaderValue::from_static("text/turtle, application/n-triples;q=0.9, */*;q=0.1");

#[derive(Clone)]
pub(super) struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub(super) fn new(timeout: Duration) -> Result<HttpClient> {
        Ok(HttpClient {
            client: Client::builder()
                .http1_only()
                .user_agent(APP_USER_AGENT)
                .gzip(true)
                .timeout(timeout)
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    pub(super) async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, ACCEPT_RDF)
            .send()
            .await?;
        if response.error_for_status_ref().is_err() {
            let code = response.status();
            bail!("fetching {url} failed with status {code}");
        }
        Ok(response.bytes().await?.to_vec())
    }
}
