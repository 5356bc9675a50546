//! Sign-in flows issuing token pairs

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{verify_password, IdentityProvider, TokenService};
use crate::database::PostgresManager;
use crate::error::{TrackerError, TrackerResult};
use crate::media::{employee_photo_path, MediaStore};
use crate::models::{Employee, User};

/// Payload returned after a successful sign-in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_name: String,
    pub employee_id: String,
    pub photo: Option<String>,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SignInService {
    db: Arc<PostgresManager>,
    identity: Arc<dyn IdentityProvider>,
    media: MediaStore,
    tokens: TokenService,
}

impl SignInService {
    pub fn new(
        db: Arc<PostgresManager>,
        identity: Arc<dyn IdentityProvider>,
        media: MediaStore,
        tokens: TokenService,
    ) -> Self {
        Self {
            db,
            identity,
            media,
            tokens,
        }
    }

    /// Sign in with a Google OAuth token for an existing account
    pub async fn google(&self, id_token: &str) -> TrackerResult<SignedIn> {
        let profile = self.identity.user_info(id_token).await?;
        let email = match profile.email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ => return Err(TrackerError::BadRequest("User Not found".to_string())),
        };
        let mut user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| TrackerError::BadRequest("User Not found".to_string()))?;

        user.first_name = profile.given_name.clone().unwrap_or_default();
        user.last_name = profile.family_name.clone().unwrap_or_default();
        self.db
            .update_user_names(&user.id, &user.first_name, &user.last_name)
            .await?;

        let mut employee = self.db.get_or_create_employee(&user.id).await?;
        if let Some(picture) = profile.picture.as_deref().filter(|p| !p.is_empty()) {
            let bytes = self.identity.fetch_picture(picture).await?;
            let path = self
                .media
                .save_at(&employee_photo_path(&employee.id), &bytes)
                .await?;
            self.db.set_employee_photo(&employee.id, &path).await?;
            employee.photo = Some(path);
        }

        info!("User {} signed in with Google", user.email);
        self.finish(&user, &employee).await
    }

    /// Sign in with email and password
    pub async fn password(&self, email: &str, password: &str) -> TrackerResult<SignedIn> {
        let rejected =
            || TrackerError::Unauthorized("No active account found with the given credentials".to_string());

        let user = self.db.get_user_by_email(email).await?.ok_or_else(rejected)?;
        if !user.is_active || !verify_password(password, &user.password_hash) {
            warn!("Rejected password sign-in for {}", email);
            return Err(rejected());
        }

        let employee = self.db.get_or_create_employee(&user.id).await?;
        info!("User {} signed in with password", user.email);
        self.finish(&user, &employee).await
    }

    async fn finish(&self, user: &User, employee: &Employee) -> TrackerResult<SignedIn> {
        let pair = self.tokens.issue_pair(&user.id)?;
        self.db.record_login(&user.id).await?;
        Ok(SignedIn {
            id: employee.id.clone(),
            employee_name: user.full_name(),
            employee_id: employee.employee_id.clone(),
            photo: self.media.url_opt(employee.photo.as_deref()),
            email: user.email.clone(),
            access_token: pair.access,
            refresh_token: pair.refresh,
        })
    }
}
