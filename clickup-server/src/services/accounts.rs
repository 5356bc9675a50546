//! Account creation rules

use std::sync::Arc;
use tracing::info;

use crate::auth::hash_password;
use crate::database::PostgresManager;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{NewUser, User};

/// Lowercase the domain part of an address, keeping the local part as given
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Check required fields and resolve flags of a regular account
pub fn prepare_user(mut user: NewUser) -> TrackerResult<NewUser> {
    if user.email.trim().is_empty() {
        return Err(TrackerError::field("email", "Users must have an email address"));
    }
    if user.username.trim().is_empty() {
        return Err(TrackerError::field("username", "The given username must be set"));
    }
    if user.password.is_empty() {
        return Err(TrackerError::field("password", "The given password must be set"));
    }
    user.email = normalize_email(&user.email);
    user.is_staff = Some(user.is_staff.unwrap_or(false));
    user.is_superuser = Some(user.is_superuser.unwrap_or(false));
    user.is_active = Some(user.is_active.unwrap_or(false));
    Ok(user)
}

/// Same as `prepare_user` but every flag defaults to true and must stay so
pub fn prepare_superuser(mut user: NewUser) -> TrackerResult<NewUser> {
    if user.is_staff == Some(false) {
        return Err(TrackerError::field("isStaff", "Superuser must have is_staff=True."));
    }
    if user.is_superuser == Some(false) {
        return Err(TrackerError::field(
            "isSuperuser",
            "Superuser must have is_superuser=True.",
        ));
    }
    user.is_staff = Some(true);
    user.is_superuser = Some(true);
    user.is_active = Some(user.is_active.unwrap_or(true));
    prepare_user(user)
}

pub struct AccountService {
    db: Arc<PostgresManager>,
}

impl AccountService {
    pub fn new(db: Arc<PostgresManager>) -> Self {
        Self { db }
    }

    pub async fn create_user(&self, user: NewUser) -> TrackerResult<User> {
        let user = prepare_user(user)?;
        self.store(user).await
    }

    pub async fn create_superuser(&self, user: NewUser) -> TrackerResult<User> {
        let user = prepare_superuser(user)?;
        self.store(user).await
    }

    async fn store(&self, user: NewUser) -> TrackerResult<User> {
        let hash = hash_password(&user.password)?;
        let created = self.db.insert_user(&user, &hash).await?;
        info!(
            "Created user {} (staff: {}, superuser: {})",
            created.email, created.is_staff, created.is_superuser
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_only_the_domain() {
        assert_eq!(normalize_email("Jane.Doe@Example.COM"), "Jane.Doe@example.com");
        assert_eq!(normalize_email(" no-at-sign "), "no-at-sign");
    }

    #[test]
    fn regular_users_start_inactive() {
        let user = prepare_user(NewUser::new("jane", "jane@EXAMPLE.com", "pw")).unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.is_staff, Some(false));
        assert_eq!(user.is_superuser, Some(false));
        assert_eq!(user.is_active, Some(false));
    }

    #[test]
    fn email_is_checked_first() {
        let err = prepare_user(NewUser::new("", "", "")).unwrap_err();
        match err {
            TrackerError::Validation(fields) => {
                assert_eq!(fields["email"], vec!["Users must have an email address"]);
                assert_eq!(fields.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn superusers_get_every_flag() {
        let user = prepare_superuser(NewUser::new("root", "root@example.com", "pw")).unwrap();
        assert_eq!(user.is_staff, Some(true));
        assert_eq!(user.is_superuser, Some(true));
        assert_eq!(user.is_active, Some(true));
    }

    #[test]
    fn superusers_cannot_opt_out_of_staff() {
        let mut user = NewUser::new("root", "root@example.com", "pw");
        user.is_staff = Some(false);
        assert!(prepare_superuser(user).is_err());

        let mut user = NewUser::new("root", "root@example.com", "pw");
        user.is_superuser = Some(false);
        assert!(prepare_superuser(user).is_err());
    }
}
