use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::storage::CredentialStorage;

/// Opaque bearer token plus the in-memory session epoch it was issued under.
///
/// Only the token is persisted. The epoch lets callers tell whether a
/// credential captured before an await is still the live one.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    epoch: u64,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// What observers see after each session mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub credential: Option<Credential>,
    pub epoch: u64,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }
}

struct SessionInner {
    storage: Box<dyn CredentialStorage>,
    key: String,
    state: watch::Sender<SessionSnapshot>,
}

/// Cloneable handle over the one active credential.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// Read the persisted token once; all later reads are served from memory.
    pub fn open(storage: impl CredentialStorage + 'static, key: impl Into<String>) -> Self {
        let key = key.into();
        let persisted = match storage.load(&key) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read persisted session, starting logged out: {}", e);
                None
            }
        };

        let snapshot = match persisted {
            Some(token) => {
                info!("Restored persisted session");
                SessionSnapshot {
                    credential: Some(Credential { token, epoch: 1 }),
                    epoch: 1,
                }
            }
            None => SessionSnapshot::default(),
        };

        let (state, _) = watch::channel(snapshot);

        Self {
            inner: Arc::new(SessionInner {
                storage: Box::new(storage),
                key,
                state,
            }),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.inner.state.borrow().credential.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// True while `credential` is the live one; false once logged out or replaced.
    pub fn is_current(&self, credential: &Credential) -> bool {
        self.inner.state.borrow().credential.as_ref() == Some(credential)
    }

    /// Observers receive the new snapshot before `login`/`logout` return.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Replace any current credential with `token` and persist it.
    pub fn login(&self, token: impl Into<String>) -> Credential {
        let token = token.into();
        let mut issued = None;

        self.inner.state.send_modify(|snapshot| {
            if let Err(e) = self.inner.storage.store(&self.inner.key, &token) {
                warn!("Failed to persist session token: {}", e);
            }
            snapshot.epoch += 1;
            let credential = Credential {
                token: token.clone(),
                epoch: snapshot.epoch,
            };
            snapshot.credential = Some(credential.clone());
            issued = Some(credential);
        });

        let credential = issued.unwrap_or(Credential { token, epoch: 0 });
        info!("Session started (epoch {})", credential.epoch);
        credential
    }

    /// Clear the credential. Safe to call repeatedly; returns whether a
    /// session was actually ended.
    pub fn logout(&self) -> bool {
        self.end_session(None)
    }

    /// Forced logout from a failure handler. Only ends the session if
    /// `credential` is still current, so a late failure from an old session
    /// leaves a newer one alone.
    pub fn expire(&self, credential: &Credential) -> bool {
        let ended = self.end_session(Some(credential));
        if ended {
            warn!(
                "Session epoch {} rejected by backend, logged out",
                credential.epoch
            );
        }
        ended
    }

    fn end_session(&self, only: Option<&Credential>) -> bool {
        let mut ended = false;

        self.inner.state.send_if_modified(|snapshot| {
            let Some(current) = snapshot.credential.as_ref() else {
                return false;
            };
            if only.is_some_and(|expected| expected != current) {
                return false;
            }

            if let Err(e) = self.inner.storage.remove(&self.inner.key) {
                warn!("Failed to remove persisted session token: {}", e);
            }
            snapshot.credential = None;
            snapshot.epoch += 1;
            ended = true;
            true
        });

        if ended {
            info!("Session ended");
        }
        ended
    }
}
