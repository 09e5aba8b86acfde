//! Blocking HTTP transport built on reqwest

use std::fs;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION, USER_AGENT};

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError, TransportResult};
use crate::config::ClientConfig;
use crate::errors::{Error, Result};
use crate::observability::Logger;

/// Production transport: one blocking reqwest call per request.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    user_agent: String,
    /// Pre-encoded `Authorization` header value
    authorization: Option<String>,
}

impl HttpTransport {
    /// Builds the HTTP client described by `config`.
    ///
    /// TLS roots come from `ca_cert_file` (or `CACERTSFILE`); certificate
    /// verification is only disabled when `accept_invalid_certs` is set.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        // The transport's timeout is the only deadline the client has.
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        if let Some(path) = config.resolved_ca_cert_file() {
            Logger::info("CA_CERT_FILE_LOADING", &[("path", path.as_str())]);
            let pem = fs::read(&path)
                .map_err(|e| Error::Config(format!("failed to read CA cert file {}: {}", path, e)))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| Error::Config(format!("invalid CA cert file {}: {}", path, e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let authorization = config.credentials().map(|(username, password)| {
            let credentials = format!("{}:{}", username, password);
            format!(
                "Basic {}",
                general_purpose::STANDARD.encode(credentials.as_bytes())
            )
        });

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            authorization,
        })
    }

    fn reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let mut builder = self
            .client
            .request(Self::reqwest_method(request.method), &request.url)
            .header(ACCEPT, "application/json; charset=UTF-8")
            .header(USER_AGENT, &self.user_agent);

        if let Some(ref authorization) = self.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        log::debug!("[LINK_HTTP] {} {}", request.method, request.url);
        let response = builder.send()?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text()?;
        log::debug!("[LINK_HTTP] status={} bytes={}", status, text.len());

        let body = if text.trim().is_empty() {
            None
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                // A 2xx response must carry JSON; error pages are kept as text
                // so the protocol error can still show them.
                Err(e) if (200..300).contains(&status) => {
                    return Err(TransportError::MalformedBody(e.to_string()));
                }
                Err(_) => Some(serde_json::Value::String(text)),
            }
        };

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}
