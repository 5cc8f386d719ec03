//! Reqwest-backed proxy callback delivery.

use std::sync::Arc;

use async_trait::async_trait;
use casticket::{BoxError, proxy::ProxyCallbackClient};
use reqwest::{Client, redirect::Policy};
use tracing::debug;
use url::Url;

use crate::{
    config::CallbackClientConfig,
    error::{CallbackError, Result},
};

/// Delivers proxy-granting tickets with an HTTP GET.
///
/// Redirects are not followed; a redirect status is judged against the
/// acceptable set like any other. The response body is discarded.
#[derive(Debug, Clone)]
pub struct HttpProxyCallbackClient {
    client: Client,
    config: CallbackClientConfig,
}

impl HttpProxyCallbackClient {
    /// Builds a client from validated settings.
    ///
    /// # Errors
    ///
    /// - [`CallbackError::InvalidConfig`] if `config` fails validation.
    /// - [`CallbackError::Client`] if the HTTP client cannot be built.
    pub fn new(config: CallbackClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(CallbackError::Client)?;
        Ok(Self { client, config })
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &CallbackClientConfig {
        &self.config
    }

    /// Calls `url` and checks the response status.
    ///
    /// # Errors
    ///
    /// - [`CallbackError::InvalidUrl`] for a scheme other than http or https.
    /// - [`CallbackError::Transport`] if the request does not complete.
    /// - [`CallbackError::UnacceptableStatus`] for a status outside the
    ///   acceptable set.
    #[tracing::instrument(skip(self), fields(host = url.host_str().unwrap_or_default()))]
    pub async fn call(&self, url: &Url) -> Result<u16> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CallbackError::invalid_url(url.as_str(), "unsupported scheme"));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CallbackError::Transport { url: url.to_string(), source })?;

        let status = response.status().as_u16();
        if !self.config.accepts(status) {
            return Err(CallbackError::UnacceptableStatus { url: url.to_string(), status });
        }
        debug!(status, "proxy callback accepted");
        Ok(status)
    }
}

#[async_trait]
impl ProxyCallbackClient for HttpProxyCallbackClient {
    async fn send(&self, url: &Url) -> std::result::Result<(), BoxError> {
        self.call(url).await.map(|_| ()).map_err(|err| Arc::new(err) as BoxError)
    }
}
