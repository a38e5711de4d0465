//! HTTP access to the activity sign-up service.

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::Directory,
    protocol::{AcceptedReply, ErrorReply},
};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid server url '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("request failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },
    #[error("server rejected the request with status {status}")]
    Rejected { status: u16, detail: Option<String> },
    #[error("malformed response body: {reason}")]
    Body { reason: String },
}

/// Seam between the view synchronizer and the sign-up service. The
/// synchronizer takes this as an injected dependency so it can be exercised
/// without a live server.
#[async_trait]
pub trait ActivitiesApi: Send + Sync {
    async fn fetch_directory(&self) -> Result<Directory, ApiError>;
    async fn sign_up(&self, activity: &str, email: &str) -> Result<AcceptedReply, ApiError>;
    async fn unregister(&self, activity: &str, email: &str) -> Result<AcceptedReply, ApiError>;
}

pub struct HttpActivitiesApi {
    http: Client,
    base: Url,
}

impl HttpActivitiesApi {
    pub fn new(server_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(server_url).map_err(|err| ApiError::BaseUrl {
            url: server_url.to_string(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::BaseUrl {
                url: server_url.to_string(),
                reason: "url cannot carry path segments".to_string(),
            });
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Infallible: cannot-be-a-base urls are rejected at construction.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn directory_url(&self) -> Url {
        self.endpoint(&["activities"])
    }

    fn signup_url(&self, activity: &str, email: &str) -> Url {
        let mut url = self.endpoint(&["activities", activity, "signup"]);
        url.query_pairs_mut().append_pair("email", email);
        url
    }

    fn participants_url(&self, activity: &str, email: &str) -> Url {
        let mut url = self.endpoint(&["activities", activity, "participants"]);
        url.query_pairs_mut().append_pair("email", email);
        url
    }
}

#[async_trait]
impl ActivitiesApi for HttpActivitiesApi {
    async fn fetch_directory(&self) -> Result<Directory, ApiError> {
        let response = self.http.get(self.directory_url()).send().await?;
        let response = reject_error_status(response).await?;
        response
            .json::<Directory>()
            .await
            .map_err(|err| ApiError::Body {
                reason: err.to_string(),
            })
    }

    async fn sign_up(&self, activity: &str, email: &str) -> Result<AcceptedReply, ApiError> {
        let response = self.http.post(self.signup_url(activity, email)).send().await?;
        accepted_reply(response).await
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<AcceptedReply, ApiError> {
        let response = self
            .http
            .delete(self.participants_url(activity, email))
            .send()
            .await?;
        accepted_reply(response).await
    }
}

async fn accepted_reply(response: Response) -> Result<AcceptedReply, ApiError> {
    let response = reject_error_status(response).await?;
    response
        .json::<AcceptedReply>()
        .await
        .map_err(|err| ApiError::Body {
            reason: err.to_string(),
        })
}

/// Maps a non-2xx response to `ApiError::Rejected`, keeping the structured
/// `detail` when the body carries one.
async fn reject_error_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response
        .json::<ErrorReply>()
        .await
        .ok()
        .map(|reply| reply.detail);
    Err(ApiError::Rejected {
        status: status.as_u16(),
        detail,
    })
}
