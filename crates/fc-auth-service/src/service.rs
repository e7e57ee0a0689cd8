//! # Account Service
//!
//! Registration, credential checks, and token issuance over a `UserStore`.

use crate::domain::{
    AuthError, Credentials, PasswordHash, Registration, StoredUserPatch, UserPatch, UserView,
};
use crate::ports::UserStore;
use shared_types::{SubjectId, TokenSigner};
use std::sync::Arc;
use tracing::{debug, info};

/// Successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub username: String,
}

pub struct AccountService {
    store: Arc<dyn UserStore>,
    signer: Arc<TokenSigner>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, signer: Arc<TokenSigner>) -> Self {
        Self { store, signer }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn signer(&self) -> &Arc<TokenSigner> {
        &self.signer
    }

    pub async fn register(&self, registration: Registration) -> Result<i64, AuthError> {
        registration.validate()?;
        let password = PasswordHash::generate(&registration.password);
        let id = self
            .store
            .insert(registration.username, registration.email, password)
            .await?;
        info!(user_id = id, "User registered");
        Ok(id)
    }

    /// Check `credentials` and issue an access token for the user.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let user = self
            .store
            .find_by_email(&credentials.email)
            .await?
            .filter(|user| user.password.verify(&credentials.password))
            .ok_or_else(|| {
                debug!("Login rejected");
                AuthError::InvalidCredentials
            })?;

        Ok(Session {
            access_token: self.signer.issue(SubjectId(user.id)),
            username: user.username,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserView>, AuthError> {
        let users = self.store.list().await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    pub async fn update_user(&self, id: i64, patch: UserPatch) -> Result<(), AuthError> {
        patch.validate()?;
        let stored = StoredUserPatch {
            username: patch.username,
            email: patch.email,
            password: patch.password.as_deref().map(PasswordHash::generate),
        };
        self.store.update(id, stored).await?;
        info!(user_id = id, "User updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteUserStore;
    use shared_types::{IdentityVerifier, DEFAULT_TOKEN_TTL};
    use txn_participant::open_connection;

    fn service() -> AccountService {
        let store = SqliteUserStore::new(open_connection(":memory:").unwrap()).unwrap();
        let signer = TokenSigner::new("secret", DEFAULT_TOKEN_TTL).unwrap();
        AccountService::new(Arc::new(store), Arc::new(signer))
    }

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_login_issues_token_for_user_id() {
        let service = service();
        let id = service
            .register(registration("alice", "a@x.com", "pw"))
            .await
            .unwrap();

        let session = service.login(credentials("a@x.com", "pw")).await.unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(
            service.signer().verify(&session.access_token),
            Ok(SubjectId(id))
        );
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let service = service();
        service
            .register(registration("alice", "a@x.com", "pw"))
            .await
            .unwrap();

        let wrong_password = service.login(credentials("a@x.com", "nope")).await;
        let unknown_email = service.login(credentials("b@x.com", "pw")).await;
        assert_eq!(wrong_password.unwrap_err(), AuthError::InvalidCredentials);
        assert_eq!(unknown_email.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields() {
        let service = service();
        let err = service
            .register(registration("", "a@x.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Validation("username is required".into()));
        assert!(service.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_password_change_takes_effect() {
        let service = service();
        let id = service
            .register(registration("alice", "a@x.com", "old"))
            .await
            .unwrap();
        service
            .update_user(
                id,
                UserPatch {
                    password: Some("new".into()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();

        assert!(service.login(credentials("a@x.com", "old")).await.is_err());
        assert!(service.login(credentials("a@x.com", "new")).await.is_ok());
    }
}
