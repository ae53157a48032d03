//! # User Directory Client
//!
//! REST client for the external identity/document-store service that owns
//! user accounts and profile documents. All management endpoints are direct
//! proxies: the directory's responses (including failures) surface to the
//! caller with their original message, and no retries are attempted.

use crate::config::DirectoryConfig;
use crate::directory::types::{CreatedUser, ParentProfile, ProfileListing};
use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Client handle for the user-directory service.
///
/// Constructed once at startup when a directory base URL is configured,
/// then shared read-only by the management handlers.
pub struct DirectoryClient {
    client: reqwest::Client,
    config: DirectoryConfig,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build directory HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Extract the upstream error message from a failed response.
    ///
    /// The directory reports failures as `{"error": {"message": "…"}}`; if
    /// the body doesn't match that shape, the raw text is used instead.
    async fn upstream_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => value["error"]["message"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("directory returned {}: {}", status, body)),
            Err(_) => format!("directory returned {}: {}", status, body),
        }
    }

    /// Create an identity record and its parent profile document.
    ///
    /// Two sequential calls, matching the directory contract: the identity
    /// record first (which assigns the uid), then the profile document keyed
    /// by that uid.
    pub async fn create_parent(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<CreatedUser> {
        let response = self
            .client
            .post(self.endpoint("identity/users"))
            .bearer_auth(&self.config.service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "display_name": name,
            }))
            .send()
            .await
            .context("directory create-user request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(Self::upstream_message(response).await);
        }

        let created: CreatedUser = response
            .json()
            .await
            .context("failed to parse create-user response")?;

        debug!(uid = %created.uid, "Identity record created");

        let profile = json!({
            "email": email,
            "name": name,
            "role": "parent",
            "children": [],
            "created_at": chrono::Utc::now().to_rfc3339(),
        });

        let response = self
            .client
            .put(self.endpoint(&format!("documents/users/{}", created.uid)))
            .bearer_auth(&self.config.service_key)
            .json(&profile)
            .send()
            .await
            .context("directory create-profile request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(Self::upstream_message(response).await);
        }

        Ok(created)
    }

    /// List all profile documents with the parent role.
    pub async fn list_parents(&self) -> Result<Vec<ParentProfile>> {
        let response = self
            .client
            .get(self.endpoint("documents/users"))
            .query(&[("role", "parent")])
            .bearer_auth(&self.config.service_key)
            .send()
            .await
            .context("directory list request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(Self::upstream_message(response).await);
        }

        let listing: ProfileListing = response
            .json()
            .await
            .context("failed to parse profile listing")?;

        Ok(listing.documents)
    }

    /// Delete an identity record and its profile document.
    pub async fn delete_parent(&self, uid: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("identity/users/{}", uid)))
            .bearer_auth(&self.config.service_key)
            .send()
            .await
            .context("directory delete-user request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(Self::upstream_message(response).await);
        }

        let response = self
            .client
            .delete(self.endpoint(&format!("documents/users/{}", uid)))
            .bearer_auth(&self.config.service_key)
            .send()
            .await
            .context("directory delete-profile request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(Self::upstream_message(response).await);
        }

        Ok(())
    }

    /// Overwrite the password on an identity record.
    pub async fn set_password(&self, uid: &str, new_password: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&format!("identity/users/{}/password", uid)))
            .bearer_auth(&self.config.service_key)
            .json(&json!({ "password": new_password }))
            .send()
            .await
            .context("directory password-reset request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(Self::upstream_message(response).await);
        }

        Ok(())
    }
}
