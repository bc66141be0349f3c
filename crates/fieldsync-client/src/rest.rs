//! REST collaborator client.
//!
//! Bulk fetches used for the initial load and the polling fallback, plus the
//! message post used when the chat channel is down. Every request carries
//! `Authorization: Bearer <token>` when a token is configured.

use fieldsync_proto::{
    ChatMessage, Pickup,
    rest::{ApiEnvelope, AvailablePickups, ChatRoomData, CompletedPickups, PendingPickups},
};
use reqwest::{
    Client as HttpClient, RequestBuilder,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Page size requested from the completed-pickups endpoint.
pub const COMPLETED_PAGE_SIZE: u32 = 20;

/// Image sent alongside a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// File name reported to the server
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`
    pub mime: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// REST errors.
#[derive(Debug, Error)]
pub enum RestError {
    /// Base URL is unusable.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Request could not be sent or the response body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("{url} returned {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RestError {
    /// Returns true if retrying on the next poll may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Url(_) | Self::Decode(_) => false,
        }
    }
}

/// HTTP client for the worker API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: HttpClient,
    base: Url,
    token: Option<String>,
}

impl RestClient {
    /// Client for the API at `server`. A bare host defaults to https.
    pub fn new(server: &str, token: Option<String>) -> Result<Self, RestError> {
        let trimmed = server.trim().trim_end_matches('/');
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let base = Url::parse(&format!("{with_scheme}/"))?;

        Ok(Self { http: HttpClient::new(), base, token })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RestError> {
        Ok(self.base.join(path)?)
    }

    fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RestError> {
        debug!(%url, "GET");
        let resp = self.with_auth(self.http.get(url.clone())).send().await?;
        if !resp.status().is_success() {
            return Err(RestError::Status { status: resp.status().as_u16(), url: url.into() });
        }
        let body = resp.bytes().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.data)
    }

    /// Pickups assigned to this worker.
    pub async fn pending_pickups(&self) -> Result<Vec<Pickup>, RestError> {
        let url = self.endpoint("api/users/worker/dashboard/pending_pickups/")?;
        Ok(self.get::<PendingPickups>(url).await?.pending_pickups)
    }

    /// Pickups open to any worker.
    pub async fn available_pickups(&self) -> Result<Vec<Pickup>, RestError> {
        let url = self.endpoint("api/users/worker/dashboard/available_pickups/")?;
        Ok(self.get::<AvailablePickups>(url).await?.available_pickups)
    }

    /// Most recent completed pickups.
    pub async fn completed_pickups(&self) -> Result<Vec<Pickup>, RestError> {
        let mut url = self.endpoint("api/users/worker/dashboard/completed_pickups/")?;
        url.query_pairs_mut().append_pair("page_size", &COMPLETED_PAGE_SIZE.to_string());
        Ok(self.get::<CompletedPickups>(url).await?.completed_pickups)
    }

    /// Every bucket, concatenated pending, available, completed.
    ///
    /// The three requests run concurrently. Any failure fails the whole fetch.
    pub async fn all_pickups(&self) -> Result<Vec<Pickup>, RestError> {
        let (pending, available, completed) = tokio::try_join!(
            self.pending_pickups(),
            self.available_pickups(),
            self.completed_pickups()
        )?;

        let mut all = pending;
        all.extend(available);
        all.extend(completed);
        Ok(all)
    }

    /// Messages of `room`, oldest first.
    pub async fn messages(&self, room: &str) -> Result<Vec<ChatMessage>, RestError> {
        let url = self.endpoint(&format!("api/users/worker/chat/{room}/"))?;
        Ok(self.get::<ChatRoomData>(url).await?.messages)
    }

    /// Post a text message to `room`.
    pub async fn post_message(&self, room: &str, body: &str) -> Result<(), RestError> {
        self.post_message_with_image(room, body, None).await
    }

    /// Post a message to `room`, with an optional image part.
    pub async fn post_message_with_image(
        &self,
        room: &str,
        body: &str,
        image: Option<ImageAttachment>,
    ) -> Result<(), RestError> {
        let url = self.endpoint(&format!("api/users/worker/chat/{room}/"))?;
        debug!(%url, image = image.is_some(), "POST");

        let form = message_form(body, image)?;
        let resp = self.with_auth(self.http.post(url.clone())).multipart(form).send().await?;
        if !resp.status().is_success() {
            return Err(RestError::Status { status: resp.status().as_u16(), url: url.into() });
        }
        Ok(())
    }
}

/// Multipart body of a chat post: `message`, plus `image` when attached.
fn message_form(body: &str, image: Option<ImageAttachment>) -> Result<Form, RestError> {
    let form = Form::new().text("message", body.to_string());
    let Some(image) = image else {
        return Ok(form);
    };
    let part = Part::bytes(image.bytes).file_name(image.file_name).mime_str(&image.mime)?;
    Ok(form.part("image", part))
}
