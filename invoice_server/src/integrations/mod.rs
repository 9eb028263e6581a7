//! HTTP clients for the services the engine depends on.
//!
//! Each client implements one of the engine's collaborator traits, so the engine never sees HTTP.
mod alerts;
mod bus;
mod custody;
mod prices;

use std::{sync::Arc, time::Duration};

pub use alerts::AlertClient;
pub use bus::HttpBusPublisher;
pub use custody::CustodyClient;
use invoice_engine::traits::CollaboratorError;
use ipg_common::Secret;
use log::*;
pub use prices::PriceClient;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::ServerError;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// A JSON-over-HTTP client bound to one base URL.
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    client: Arc<Client>,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &Secret<String>, timeout: Duration) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(2);
        if !api_key.is_empty() {
            let val = HeaderValue::from_str(api_key.reveal().as_str())
                .map_err(|e| ServerError::InitializeError(format!("Invalid API key. {e}")))?;
            headers.insert(API_KEY_HEADER, val);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    pub async fn query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, CollaboratorError> {
        let response = self.send(method, path, body).await?;
        response.json::<T>().await.map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }

    /// Like [`Self::query`], for endpoints whose response body carries nothing of interest.
    pub async fn command<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<(), CollaboratorError> {
        self.send(method, path, body).await.map(|_| ())
    }

    /// Posts a pre-serialized JSON body.
    pub async fn post_raw(&self, path: &str, body: Vec<u8>) -> Result<(), CollaboratorError> {
        let url = self.url(path);
        trace!("🌐️ POST {url} ({} bytes)", body.len());
        let response = self.client.post(url).body(body).send().await.map_err(transport_error)?;
        check_status(response).await.map(|_| ())
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let url = self.url(path);
        trace!("🌐️ {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(transport_error)?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    debug!("🌐️ Request failed with {status}. {message}");
    Err(error_for_status(status, message))
}

/// Client errors mean the service understood and refused the request. Anything else may succeed on a retry.
pub fn error_for_status(status: StatusCode, message: String) -> CollaboratorError {
    let message = if message.is_empty() { status.to_string() } else { format!("{status}: {message}") };
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::REQUEST_TIMEOUT {
        CollaboratorError::Rejected(message)
    } else {
        CollaboratorError::Unavailable(message)
    }
}

fn transport_error(e: reqwest::Error) -> CollaboratorError {
    if e.is_decode() {
        CollaboratorError::InvalidResponse(e.to_string())
    } else {
        CollaboratorError::Unavailable(e.to_string())
    }
}
