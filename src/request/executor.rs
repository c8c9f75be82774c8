use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::debug::debug_log;
use crate::error::{Error, Result};
use crate::request::{Body, ClientConfig, Request};

/// Multi-valued response headers, keyed by lowercase header name.
pub type ResponseHeaders = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: ResponseHeaders,
}

/// Executes a single request. Implementations must not retry.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: &Request, body: &Body) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpExecutor + ?Sized> HttpExecutor for std::sync::Arc<T> {
    async fn execute(&self, request: &Request, body: &Body) -> Result<HttpResponse> {
        (**self).execute(request, body).await
    }
}

/// [`HttpExecutor`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &Request, body: &Body) -> Result<reqwest::RequestBuilder> {
        let url = Url::parse(request.url()).map_err(|source| Error::InvalidUrl {
            url: request.url().to_string(),
            source,
        })?;

        let headers = to_header_map(request.headers())?;
        let mut builder = self
            .client
            .request(request.method().into(), url)
            .headers(headers);

        if request.method().sends_body() {
            if let Some(bytes) = body.to_bytes()? {
                if matches!(body, Body::Json(_)) && !has_content_type(request) {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder = builder.body(bytes);
            }
        }

        Ok(builder)
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: &Request, body: &Body) -> Result<HttpResponse> {
        let builder = self.build(request, body)?;
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = from_header_map(response.headers());
        let body = response.bytes().await?.to_vec();

        debug_log(request, status, &headers, &body);

        Ok(HttpResponse {
            status,
            body,
            headers,
        })
    }
}

fn has_content_type(request: &Request) -> bool {
    request
        .headers()
        .keys()
        .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
}

fn to_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

fn from_header_map(headers: &HeaderMap) -> ResponseHeaders {
    let mut out = ResponseHeaders::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        out.insert(name.as_str().to_string(), values);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn rejects_invalid_header_name() {
        let err = to_header_map(&headers(&[("bad header", "x")])).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { name, .. } if name == "bad header"));
    }

    #[test]
    fn rejects_invalid_header_value() {
        let err = to_header_map(&headers(&[("x-test", "line\nbreak")])).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    #[test]
    fn response_headers_keep_every_value() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("text/plain"));

        let out = from_header_map(&map);
        assert_eq!(out["set-cookie"], vec!["a=1", "b=2"]);
        assert_eq!(out["content-type"], vec!["text/plain"]);
    }

    #[tokio::test]
    async fn invalid_url_is_a_build_error() {
        let executor = ReqwestExecutor::new().unwrap();
        let request = Request::new(Method::Get, "not a url", HashMap::new());
        let err = executor.execute(&request, &Body::Empty).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn content_type_detection_ignores_case() {
        let request = Request::new(
            Method::Post,
            "http://localhost",
            headers(&[("Content-Type", "text/plain")]),
        );
        assert!(has_content_type(&request));
        let request = Request::new(Method::Post, "http://localhost", HashMap::new());
        assert!(!has_content_type(&request));
    }
}
