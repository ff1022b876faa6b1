//! Authentication seam: who is signed in, and sign-in state changes.
//!
//! The application has no user management of its own. It forwards credentials
//! to an [`IdentityProvider`] and tracks the result in a [`Session`].

mod credentials;

pub use credentials::*;

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::info;

use crate::document::{DocumentBuilder, Timestamp, OWNER_FIELD};
use crate::store::{DocumentStore, StoreError};

/// Collection holding one profile document per user, keyed by user id.
pub const USERS_COLLECTION: &str = "users";

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    Invalid(#[from] CredentialError),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Sign-in state as published to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(String),
    SignedOut,
}

/// Source of the current user's identity.
pub trait AuthProvider: Send + Sync {
    /// Opaque id of the signed-in user.
    fn current_user_id(&self) -> Option<String>;

    /// Stream of sign-in state changes, starting with the current state.
    fn subscribe(&self) -> Receiver<AuthState>;
}

/// External service that owns accounts and passwords.
pub trait IdentityProvider: Send + Sync {
    /// Create an account and return its user id.
    fn create_user(&self, email: &str, password: &str) -> AuthResult<String>;

    /// Verify credentials and return the user id.
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<String>;

    fn sign_out(&self) -> AuthResult<()>;
}

#[derive(Default)]
struct SessionInner {
    user_id: Option<String>,
    listeners: Vec<Sender<AuthState>>,
}

/// In-process sign-in state.
#[derive(Default)]
pub struct Session {
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts signed in.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(user_id);
        session
    }

    // A poisoned lock still holds a consistent user id.
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let mut inner = self.lock();
        inner.user_id = Some(user_id.clone());
        Self::publish(&mut inner, AuthState::SignedIn(user_id));
    }

    pub fn sign_out(&self) {
        let mut inner = self.lock();
        if inner.user_id.take().is_some() {
            Self::publish(&mut inner, AuthState::SignedOut);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().user_id.is_some()
    }

    fn publish(inner: &mut SessionInner, state: AuthState) {
        inner
            .listeners
            .retain(|listener| listener.send(state.clone()).is_ok());
    }
}

impl AuthProvider for Session {
    fn current_user_id(&self) -> Option<String> {
        self.lock().user_id.clone()
    }

    fn subscribe(&self) -> Receiver<AuthState> {
        let (tx, rx) = channel();
        let mut inner = self.lock();
        let current = match &inner.user_id {
            Some(id) => AuthState::SignedIn(id.clone()),
            None => AuthState::SignedOut,
        };
        if tx.send(current).is_ok() {
            inner.listeners.push(tx);
        }
        rx
    }
}

/// Sign-up, login and logout against an identity provider.
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    session: Arc<Session>,
}

impl AuthService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            provider,
            store,
            session,
        }
    }

    /// Create the account, write its profile document and sign in.
    pub fn sign_up(&self, form: &SignupForm) -> AuthResult<String> {
        check_signup(form)?;
        let user_id = self.provider.create_user(&form.email, &form.password)?;

        let profile = DocumentBuilder::new()
            .set("uid", user_id.as_str())
            .set(OWNER_FIELD, user_id.as_str())
            .set("fullName", form.full_name.trim())
            .set("email", form.email.as_str())
            .set("createdAt", Timestamp::now())
            .build();
        self.store.set(USERS_COLLECTION, &user_id, profile)?;

        self.session.sign_in(user_id.clone());
        info!(user = %user_id, "account created");
        Ok(user_id)
    }

    pub fn login(&self, email: &str, password: &str) -> AuthResult<String> {
        check_login(email, password)?;
        let user_id = self.provider.sign_in(email, password)?;
        self.session.sign_in(user_id.clone());
        info!(user = %user_id, "signed in");
        Ok(user_id)
    }

    pub fn logout(&self) -> AuthResult<()> {
        self.provider.sign_out()?;
        self.session.sign_out();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;
    use crate::store::SqliteStore;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeIdentity {
        accounts: Mutex<HashMap<String, (String, String)>>,
    }

    impl IdentityProvider for FakeIdentity {
        fn create_user(&self, email: &str, password: &str) -> AuthResult<String> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::Provider("email already in use".into()));
            }
            let uid = format!("uid-{}", accounts.len() + 1);
            accounts.insert(email.into(), (password.into(), uid.clone()));
            Ok(uid)
        }

        fn sign_in(&self, email: &str, password: &str) -> AuthResult<String> {
            match self.accounts.lock().unwrap().get(email) {
                Some((pw, uid)) if pw == password => Ok(uid.clone()),
                _ => Err(AuthError::Provider("wrong email or password".into())),
            }
        }

        fn sign_out(&self) -> AuthResult<()> {
            Ok(())
        }
    }

    fn setup() -> (AuthService, Arc<dyn DocumentStore>, Arc<Session>) {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let session = Arc::new(Session::new());
        let service = AuthService::new(
            Arc::new(FakeIdentity::default()),
            Arc::clone(&store),
            Arc::clone(&session),
        );
        (service, store, session)
    }

    fn form() -> SignupForm {
        SignupForm {
            full_name: " Grace Hopper ".into(),
            email: "grace@example.com".into(),
            password: "cobol1959".into(),
            confirm_password: "cobol1959".into(),
            accepted_terms: true,
        }
    }

    #[test]
    fn test_session_publishes_changes() {
        let session = Session::new();
        let rx = session.subscribe();
        assert_eq!(rx.recv().unwrap(), AuthState::SignedOut);

        session.sign_in("u1");
        assert_eq!(session.current_user_id().as_deref(), Some("u1"));
        assert_eq!(rx.recv().unwrap(), AuthState::SignedIn("u1".into()));

        session.sign_out();
        assert!(!session.is_authenticated());
        assert_eq!(rx.recv().unwrap(), AuthState::SignedOut);

        // Signing out twice publishes nothing new.
        session.sign_out();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let session = Session::new();
        drop(session.subscribe());
        session.sign_in("u1");
        assert!(session.lock().listeners.is_empty());
    }

    #[test]
    fn test_sign_up_writes_profile_and_signs_in() {
        let (service, store, session) = setup();
        let uid = service.sign_up(&form()).unwrap();

        assert_eq!(session.current_user_id(), Some(uid.clone()));
        let profile = store.get(USERS_COLLECTION, &uid).unwrap().unwrap();
        assert_eq!(profile.get("fullName"), Some(&Value::from("Grace Hopper")));
        assert_eq!(profile.get(OWNER_FIELD), Some(&Value::from(uid.as_str())));
    }

    #[test]
    fn test_sign_up_validates_before_provider() {
        let (service, _, session) = setup();
        let mut bad = form();
        bad.accepted_terms = false;
        let err = service.sign_up(&bad).unwrap_err();
        assert!(matches!(err, AuthError::Invalid(CredentialError::TermsNotAccepted)));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_login_and_logout() {
        let (service, _, session) = setup();
        let uid = service.sign_up(&form()).unwrap();
        service.logout().unwrap();
        assert!(!session.is_authenticated());

        assert!(service.login("grace@example.com", "wrong-pass").is_err());
        assert_eq!(service.login("grace@example.com", "cobol1959").unwrap(), uid);
        assert!(session.is_authenticated());
    }
}
