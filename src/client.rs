//! # client: object store operations behind a mockable trait
//!
//! [`ObjectStore`] is the seam between the upload pipeline and the remote
//! store: one method per HTTP operation, implemented by [`SwiftClient`] for a
//! real Swift-style store and by `mockall`-generated mocks in tests.
//!
//! Transport notes, kept visible rather than hidden:
//! - Object bodies are fully buffered (`Vec<u8>`) before the PUT goes out;
//!   streaming request entities against the store proved unreliable.
//! - Each operation is one logical request; reqwest's connection pool is the
//!   only reuse in play. Per-request timeouts come from the injected
//!   `reqwest::Client`.
//! - Every operation resolves a credential first. A 401 from the store forces
//!   one credential refresh and one retry, then the failure surfaces.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::auth::{Authenticator, Credential};
use crate::error::StoreError;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const MANIFEST_QUERY: [(&str, &str); 1] = [("multipart-manifest", "put")];

/// Store operations the upload pipeline depends on.
///
/// Success for PUT/DELETE is any status below 300, matching the store's
/// convention of 201/202/204 responses for mutations.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads one object and returns the `Etag` the store computed for it.
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        body: Vec<u8>,
    ) -> Result<String, StoreError>;

    /// Commits a manifest: the body is a JSON list of constituent objects and
    /// the `multipart-manifest=put` query tells the store to treat it as such
    /// rather than as object content.
    async fn put_manifest(
        &self,
        container: &str,
        name: &str,
        manifest_json: String,
    ) -> Result<(), StoreError>;

    /// Fetches an object's bytes; `None` when the store reports 404.
    async fn get_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Deletes one object.
    async fn delete_object(&self, container: &str, name: &str) -> Result<(), StoreError>;
}

/// reqwest-backed [`ObjectStore`] for Swift-style stores.
pub struct SwiftClient {
    http: reqwest::Client,
    auth: Arc<Authenticator>,
}

impl SwiftClient {
    pub fn new(http: reqwest::Client, auth: Arc<Authenticator>) -> Self {
        Self { http, auth }
    }

    /// Sends the request built by `build` with the current token attached,
    /// forcing one credential refresh and retry when the store answers 401.
    async fn send_authorised<F>(&self, build: F) -> Result<reqwest::Response, StoreError>
    where
        F: Fn(&Credential) -> reqwest::RequestBuilder,
    {
        let credential = self.auth.credential().await?;
        let response = build(&credential)
            .header(AUTH_TOKEN_HEADER, &credential.token)
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("store rejected the auth token, refreshing credential and retrying once");
        self.auth.invalidate().await;
        let credential = self.auth.credential().await?;
        let response = build(&credential)
            .header(AUTH_TOKEN_HEADER, &credential.token)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for SwiftClient {
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        body: Vec<u8>,
    ) -> Result<String, StoreError> {
        debug!(container, name, bytes = body.len(), "putting object");
        let response = self
            .send_authorised(|credential| {
                self.http
                    .put(object_url(&credential.storage_url, container, name))
                    .body(body.clone())
            })
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(status_error(response).await);
        }
        response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(StoreError::MissingEtag)
    }

    async fn put_manifest(
        &self,
        container: &str,
        name: &str,
        manifest_json: String,
    ) -> Result<(), StoreError> {
        debug!(container, name, bytes = manifest_json.len(), "putting manifest");
        let response = self
            .send_authorised(|credential| {
                self.http
                    .put(object_url(&credential.storage_url, container, name))
                    .query(&MANIFEST_QUERY)
                    .body(manifest_json.clone())
            })
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn get_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        debug!(container, name, "getting object");
        let response = self
            .send_authorised(|credential| {
                self.http
                    .get(object_url(&credential.storage_url, container, name))
            })
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.as_u16() >= 300 {
            return Err(status_error(response).await);
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn delete_object(&self, container: &str, name: &str) -> Result<(), StoreError> {
        debug!(container, name, "deleting object");
        let response = self
            .send_authorised(|credential| {
                self.http
                    .delete(object_url(&credential.storage_url, container, name))
            })
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

fn object_url(storage_url: &str, container: &str, name: &str) -> String {
    format!("{}/{container}/{name}", storage_url.trim_end_matches('/'))
}

async fn status_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::Status { status, body }
}
