//! HTTP plumbing shared by the backends and the BibTeX resolver.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::retry::{with_retry, RetryPolicy};
use crate::sources::SourceError;

/// Shared HTTP client that retries transient failures and turns
/// non-success statuses into [`SourceError`]s
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Some APIs route polite traffic by user agent (e.g. a `mailto:`)
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry: RetryPolicy::interactive(),
        })
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send the request built by `build`, rebuilding it for every attempt.
    ///
    /// `backend` names the service in error messages. 429 becomes
    /// [`SourceError::RateLimit`].
    pub async fn send<F>(&self, backend: &'static str, build: F) -> Result<Response, SourceError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        with_retry(self.retry, || {
            let request = build(&self.client);
            async move {
                let response = request.send().await?;
                let status = response.status();
                if status.is_success() {
                    Ok(response)
                } else {
                    Err(SourceError::from_status(backend, status))
                }
            }
        })
        .await
    }

    /// GET `url` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        backend: &'static str,
        url: &str,
    ) -> Result<T, SourceError> {
        self.json_with(backend, |client| client.get(url)).await
    }

    /// Like [`get_json`](Self::get_json) for requests that need extra headers
    pub async fn json_with<T, F>(&self, backend: &'static str, build: F) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let body = self.send(backend, build).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Echo {
        value: u32,
    }

    fn client() -> HttpClient {
        HttpClient::new().unwrap().retry_policy(RetryPolicy {
            attempts: 2,
            first_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(5),
            attempt_timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/echo")
            .with_status(200)
            .with_body(r#"{"value": 7}"#)
            .create_async()
            .await;

        let echo: Echo = client()
            .get_json("Echo", &format!("{}/echo", server.url()))
            .await
            .unwrap();
        assert_eq!(echo.value, 7);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let result: Result<Echo, _> = client()
            .get_json("Echo", &format!("{}/flaky", server.url()))
            .await;
        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SourceError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let result: Result<Echo, _> = client()
            .get_json("Echo", &format!("{}/busy", server.url()))
            .await;
        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::RateLimit)));
    }
}
