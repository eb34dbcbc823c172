use crate::error::{ClientError, ClientResult};
use crate::generator::{GenerateRequest, Generator};
use crate::session::SessionContext;
use crate::stream::ChunkStream;
use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, Url};

/// A [`Generator`] backed by an HTTP endpoint.
///
/// The request is POSTed as JSON and the response body is streamed back as
/// raw text chunks.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    http_client: HttpClient,
    base_url: Url,
    header_map: HeaderMap,
}

impl HttpGenerator {
    pub fn new(base_url: Url, header_map: impl Into<HeaderMap>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
            header_map: header_map.into(),
        }
    }

    pub fn builder() -> HttpGeneratorBuilder {
        HttpGeneratorBuilder::default()
    }

    pub fn url(&self) -> &Url {
        &self.base_url
    }
}

#[derive(Debug, Default)]
pub struct HttpGeneratorBuilder {
    base_url: Option<Url>,
    header_map: HeaderMap,
    http_client: Option<HttpClient>,
}

impl HttpGeneratorBuilder {
    pub fn with_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn with_url_str(self, url: &str) -> ClientResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| ClientError::config(format!("invalid url {url:?}: {e}")))?;
        Ok(self.with_url(url))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> ClientResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::config(format!("invalid header value: {e}")))?;
        self.header_map.insert(name, value);
        Ok(self)
    }

    pub fn with_bearer_token(mut self, token: &str) -> ClientResult<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::config(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        self.header_map.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Use a preconfigured client (timeouts, proxies, TLS).
    pub fn with_http_client(mut self, http_client: HttpClient) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> ClientResult<HttpGenerator> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::config("base url is required"))?;
        Ok(HttpGenerator {
            http_client: self.http_client.unwrap_or_default(),
            base_url,
            header_map: self.header_map,
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
        ctx: &SessionContext,
    ) -> ClientResult<ChunkStream<'static>> {
        debug!("session {}: POST {}", ctx.session_id(), self.base_url);
        let response = self
            .http_client
            .post(self.base_url.clone())
            .headers(self.header_map.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| ClientError::transport(e.to_string())))
            .boxed();
        Ok(stream)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
