//! The admin gate.
//!
//! Logging in writes the token `"authenticated"` under `adminToken`; every
//! admin view checks for that exact value when it mounts. Token and check
//! both live on the client, so this keeps casual visitors out of the editor
//! UI and nothing more. Credential checking is delegated to an
//! [`Authenticator`] so a real identity provider can replace the configured
//! pair.

use log::{info, warn};

use crate::content_model::keys;
use crate::content_store::ContentStore;
use crate::store_config::StoreConfig;
use crate::store_error::StoreError;

pub const AUTHENTICATED_TOKEN: &str = "authenticated";

pub trait Authenticator: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Checks against one username/password pair taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct CredentialAuthenticator {
    credentials: Option<(String, String)>,
}

impl CredentialAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some((username.into(), password.into())),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        if !config.has_admin_credentials() {
            warn!("No admin credentials configured; admin login is disabled");
            return Self::default();
        }
        match (&config.admin_username, &config.admin_password) {
            (Some(user), Some(pass)) => Self::new(user.clone(), pass.clone()),
            _ => Self::default(),
        }
    }
}

impl Authenticator for CredentialAuthenticator {
    fn verify(&self, username: &str, password: &str) -> bool {
        match &self.credentials {
            Some((user, pass)) => user == username && pass == password,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Granted,
    Denied,
}

pub struct AdminSession<'a, A: Authenticator> {
    store: &'a ContentStore,
    authenticator: A,
}

impl<'a, A: Authenticator> AdminSession<'a, A> {
    pub fn new(store: &'a ContentStore, authenticator: A) -> Self {
        Self {
            store,
            authenticator,
        }
    }

    /// On success stores the session token. A denied login leaves storage alone.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, StoreError> {
        if !self.authenticator.verify(username, password) {
            warn!("Admin login denied for '{}'", username);
            return Ok(LoginOutcome::Denied);
        }
        self.store.write_raw(keys::ADMIN_TOKEN, AUTHENTICATED_TOKEN)?;
        info!("Admin '{}' logged in", username);
        Ok(LoginOutcome::Granted)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.read_raw(keys::ADMIN_TOKEN).as_deref() == Some(AUTHENTICATED_TOKEN)
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        if self.store.remove_raw(keys::ADMIN_TOKEN)? {
            info!("Admin logged out");
        }
        Ok(())
    }
}

impl ContentStore {
    pub fn session<A: Authenticator>(&self, authenticator: A) -> AdminSession<'_, A> {
        AdminSession::new(self, authenticator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(store: &ContentStore) -> AdminSession<'_, CredentialAuthenticator> {
        store.session(CredentialAuthenticator::new("admin", "secret"))
    }

    #[test]
    fn login_grants_and_persists_token() {
        let store = ContentStore::in_memory();
        let session = session(&store);
        assert!(!session.is_authenticated());

        assert_eq!(session.login("admin", "secret").unwrap(), LoginOutcome::Granted);
        assert!(session.is_authenticated());
        assert_eq!(
            store.read_raw(keys::ADMIN_TOKEN).as_deref(),
            Some(AUTHENTICATED_TOKEN)
        );
    }

    #[test]
    fn wrong_password_is_denied() {
        let store = ContentStore::in_memory();
        let session = session(&store);
        assert_eq!(session.login("admin", "nope").unwrap(), LoginOutcome::Denied);
        assert!(!session.is_authenticated());
        assert_eq!(store.read_raw(keys::ADMIN_TOKEN), None);
    }

    #[test]
    fn token_must_match_exactly() {
        let store = ContentStore::in_memory();
        store.write_raw(keys::ADMIN_TOKEN, "Authenticated").unwrap();
        assert!(!session(&store).is_authenticated());
    }

    #[test]
    fn logout_removes_token() {
        let store = ContentStore::in_memory();
        let session = session(&store);
        session.login("admin", "secret").unwrap();
        session.logout().unwrap();
        assert!(!session.is_authenticated());
        session.logout().unwrap();
    }

    #[test]
    fn unconfigured_authenticator_denies_everyone() {
        let auth = CredentialAuthenticator::from_config(&StoreConfig::default());
        assert!(!auth.verify("", ""));
        assert!(!auth.verify("admin", "admin"));
    }
}
