//! External identity lookup for social sign-in

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::{TrackerError, TrackerResult};

/// Subset of the Google userinfo document used at sign-in
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleProfile {
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the profile behind an OAuth token
    async fn user_info(&self, token: &str) -> TrackerResult<GoogleProfile>;

    /// Download a profile picture
    async fn fetch_picture(&self, url: &str) -> TrackerResult<Vec<u8>>;
}

pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    userinfo_url: String,
}

impl GoogleIdentityProvider {
    pub fn new(config: &AuthConfig) -> TrackerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.identity_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            userinfo_url: config.google_userinfo_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn user_info(&self, token: &str) -> TrackerResult<GoogleProfile> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await?;
        debug!("Userinfo lookup answered {}", response.status());
        // Rejected tokens come back as an error document without an email,
        // which the caller reports as an unknown user
        let profile = response.json::<GoogleProfile>().await.unwrap_or_default();
        Ok(profile)
    }

    async fn fetch_picture(&self, url: &str) -> TrackerResult<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Fixed profiles, for tests and offline setups
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    pub profiles: std::collections::HashMap<String, GoogleProfile>,
    pub picture: Vec<u8>,
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn user_info(&self, token: &str) -> TrackerResult<GoogleProfile> {
        Ok(self.profiles.get(token).cloned().unwrap_or_default())
    }

    async fn fetch_picture(&self, _url: &str) -> TrackerResult<Vec<u8>> {
        if self.picture.is_empty() {
            return Err(TrackerError::Upstream("no picture available".to_string()));
        }
        Ok(self.picture.clone())
    }
}
