use log::{debug, warn};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::api::gateway::{ChatGateway, ContactGateway};
use crate::api::models::{
    ChatMessage, ChatRequest, Contact, ContactId, ContactsEnvelope, DeleteAck, ErrorBody,
    NewContact,
};
use crate::error::ApiError;

pub struct ApiClient {
    pub http: HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self::with_http(http, base_url)
    }

    pub fn with_http(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))?)
    }

    /// Turns a non-2xx response into `ApiError::Http`, keeping the backend's
    /// `detail` text when the body carries one.
    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let detail = match resp.text().await {
            Ok(body) => parse_detail(&body),
            Err(_) => None,
        };
        warn!("backend answered HTTP {} ({:?})", status.as_u16(), detail);
        Err(ApiError::Http {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// The contacts listing has been served both bare and wrapped in an envelope.
fn parse_contact_list(json: Value) -> Result<Vec<Contact>, ApiError> {
    if json.is_array() {
        return Ok(serde_json::from_value(json)?);
    }
    if json.get("contacts").is_some() {
        let envelope: ContactsEnvelope = serde_json::from_value(json)?;
        return Ok(envelope.contacts);
    }
    if let Some(arr) = json.get("data").filter(|v| v.is_array()) {
        return Ok(serde_json::from_value(arr.clone())?);
    }
    Err(ApiError::Decode(<serde_json::Error as serde::de::Error>::custom(
        "contacts listing is neither an array nor an envelope",
    )))
}

impl ContactGateway for ApiClient {
    async fn list(&self) -> Result<Vec<Contact>, ApiError> {
        let endpoint = self.endpoint("contacts")?;
        debug!("GET {}", endpoint);
        let resp = Self::check(self.http.get(endpoint).send().await?).await?;
        let json: Value = Self::decode(resp).await?;
        parse_contact_list(json)
    }

    async fn create(&self, contact: &NewContact) -> Result<Contact, ApiError> {
        let endpoint = self.endpoint("contacts")?;
        debug!("POST {}", endpoint);
        let resp = Self::check(self.http.post(endpoint).json(contact).send().await?).await?;
        Self::decode(resp).await
    }

    async fn update(&self, id: ContactId, contact: &NewContact) -> Result<Contact, ApiError> {
        let endpoint = self.endpoint(&format!("contacts/{id}"))?;
        debug!("PUT {}", endpoint);
        let resp = Self::check(self.http.put(endpoint).json(contact).send().await?).await?;
        Self::decode(resp).await
    }

    async fn delete(&self, id: ContactId) -> Result<DeleteAck, ApiError> {
        let endpoint = self.endpoint(&format!("contacts/{id}"))?;
        debug!("DELETE {}", endpoint);
        let resp = Self::check(self.http.delete(endpoint).send().await?).await?;
        // The ack body is opaque; an empty or non-JSON body still counts as success.
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }
}

impl ChatGateway for ApiClient {
    async fn send(&self, content: &str) -> Result<ChatMessage, ApiError> {
        let endpoint = self.endpoint("chat")?;
        debug!("POST {}", endpoint);
        let body = ChatRequest { content };
        let resp = Self::check(self.http.post(endpoint).json(&body).send().await?).await?;
        Self::decode(resp).await
    }

    async fn greeting(&self) -> Result<ChatMessage, ApiError> {
        let endpoint = self.endpoint("chat/hello")?;
        debug!("GET {}", endpoint);
        let resp = Self::check(self.http.get(endpoint).send().await?).await?;
        Self::decode(resp).await
    }
}
