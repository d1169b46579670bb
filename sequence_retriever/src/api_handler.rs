// src/api_handler.rs

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SequenceError};

pub const UCSC_API_URL: &str = "https://api.genome.ucsc.edu";

/// Thin JSON client over one REST base url.
///
/// No retry happens here: a non-200 answer is returned to the caller as
/// [`SequenceError::Fetch`] and any retry policy belongs to whoever deploys us.
pub struct ApiHandler {
    client: Client,
    base_url: String,
}

impl ApiHandler {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("variant-analyzer/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send()?;
        let status = response.status();

        if status != StatusCode::OK {
            let error_text = response.text().unwrap_or_default();
            warn!("Request to {} failed. Status: {}. Error: {}", url, status, error_text);
            return Err(SequenceError::Fetch {
                status: status.as_u16(),
            });
        }

        Ok(response.json()?)
    }
}
