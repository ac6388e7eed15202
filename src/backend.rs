//! Content backend client.
//!
//! Three endpoints are used:
//!
//! | Call | Method | Auth | Success |
//! |------|--------|------|---------|
//! | login | `POST {login_endpoint}` with `{email, password}` | none | 200 + `token` |
//! | create | `POST {posts_endpoint}` with the post payload | bearer | 201 |
//! | listing | `GET {posts_endpoint}?page&limit` | none | 200 |
//!
//! Every response other than the success row is classified into a
//! [`BackendError`]; nothing here retries.

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::{PostListing, PostPayload};
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const LOGIN_TIMEOUT_SECS: u64 = 15;
pub const CREATE_TIMEOUT_SECS: u64 = 30;
pub const LISTING_TIMEOUT_SECS: u64 = 15;

/// The operations the publisher and sitemap builder need from a backend.
pub trait ContentBackend {
    /// Exchange the admin credentials for a bearer token.
    async fn login(&self) -> Result<String, BackendError>;

    /// Create a post. Returns the backend id when it reports one.
    async fn create_post(
        &self,
        token: &str,
        post: &PostPayload,
    ) -> Result<Option<String>, BackendError>;

    /// One page of the public post listing (1-based).
    async fn list_posts(&self, page: u32) -> Result<PostListing, BackendError>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateResponse {
    post: Option<CreatedPost>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatedPost {
    #[serde(rename = "_id")]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Best human-readable explanation in an error response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| truncate_for_log(body, 300))
}

/// The REST backend used in production.
#[derive(Debug)]
pub struct HttpBackend<'a> {
    pub client: &'a Client,
    pub config: &'a BackendConfig,
}

impl ContentBackend for HttpBackend<'_> {
    #[instrument(level = "info", skip_all, fields(url = %self.config.login_url()))]
    async fn login(&self) -> Result<String, BackendError> {
        let resp = self
            .client
            .post(self.config.login_url())
            .json(&LoginRequest {
                email: &self.config.admin_email,
                password: &self.config.admin_password,
            })
            .timeout(Duration::from_secs(LOGIN_TIMEOUT_SECS))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let body: LoginResponse = resp
                    .json()
                    .await
                    .map_err(|e| BackendError::Decode(e.to_string()))?;
                body.token
                    .filter(|t| !t.is_empty())
                    .ok_or(BackendError::MissingToken)
            }
            StatusCode::UNAUTHORIZED => Err(BackendError::InvalidCredentials),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(BackendError::UnexpectedStatus {
                    status: status.as_u16(),
                    body: truncate_for_log(&body, 300),
                })
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(slug = %post.slug))]
    async fn create_post(
        &self,
        token: &str,
        post: &PostPayload,
    ) -> Result<Option<String>, BackendError> {
        let resp = self
            .client
            .post(self.config.posts_url())
            .bearer_auth(token)
            .json(post)
            .timeout(Duration::from_secs(CREATE_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::CREATED => {
                let created: CreateResponse = serde_json::from_str(&body).unwrap_or_default();
                Ok(created.post.and_then(|p| p.id))
            }
            StatusCode::UNAUTHORIZED => Err(BackendError::AuthRejected),
            StatusCode::CONFLICT => Err(BackendError::Conflict(error_message(&body))),
            StatusCode::BAD_REQUEST => Err(BackendError::Validation(error_message(&body))),
            other => Err(BackendError::UnexpectedStatus {
                status: other.as_u16(),
                body: truncate_for_log(&body, 300),
            }),
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_posts(&self, page: u32) -> Result<PostListing, BackendError> {
        let resp = self
            .client
            .get(self.config.posts_url())
            .query(&[("page", page), ("limit", self.config.listing_page_size)])
            .timeout(Duration::from_secs(LISTING_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::UnexpectedStatus {
                status: status.as_u16(),
                body: truncate_for_log(&body, 200),
            });
        }

        let listing: PostListing = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        debug!(page, posts = listing.posts.len(), total_pages = listing.pagination.total_pages, "Listing page fetched");
        Ok(listing)
    }
}
