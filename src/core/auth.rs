//! Admin session state for one client.
//!
//! Publishes the current identity as a live signal. Logging out always clears
//! the signal locally, and a login expires after the configured TTL.

use crate::infrastructure::auth::{Credential, Identity};
use crate::infrastructure::traits::CredentialVerifier;
use crate::{Error, Result};
use di::Ref;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct AdminState {
    identity: watch::Sender<Option<Identity>>,
    admin_mode: watch::Sender<bool>,
    /// Bumped on every login and logout so a stale expiry timer is a no-op.
    generation: AtomicU64,
}

impl AdminState {
    fn clear(&self) {
        self.identity.send_replace(None);
        self.admin_mode.send_replace(false);
    }
}

pub struct AdminSession {
    verifier: Ref<dyn CredentialVerifier>,
    ttl: Duration,
    state: Arc<AdminState>,
    expiry: Mutex<Option<JoinHandle<()>>>,
}

impl AdminSession {
    pub fn new(verifier: Ref<dyn CredentialVerifier>, ttl: Duration) -> Self {
        let (identity, _) = watch::channel(None);
        let (admin_mode, _) = watch::channel(false);
        Self {
            verifier,
            ttl,
            state: Arc::new(AdminState {
                identity,
                admin_mode,
                generation: AtomicU64::new(0),
            }),
            expiry: Mutex::new(None),
        }
    }

    /// Emits the identity, or `None`, on every login, logout and expiry.
    pub fn current_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.state.identity.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.identity.borrow().clone()
    }

    pub fn require_identity(&self) -> Result<Identity> {
        self.identity().ok_or(Error::NotAdmin)
    }

    /// The identity, provided the session is also in admin mode.
    pub fn require_admin_mode(&self) -> Result<Identity> {
        let identity = self.require_identity()?;
        if !self.is_admin_mode() {
            return Err(Error::NotAdmin);
        }
        Ok(identity)
    }

    /// Open identity watchers, such as the pending-queue stream.
    pub fn watcher_count(&self) -> usize {
        self.state.identity.receiver_count()
    }

    pub fn admin_mode(&self) -> watch::Receiver<bool> {
        self.state.admin_mode.subscribe()
    }

    pub fn is_admin_mode(&self) -> bool {
        *self.state.admin_mode.borrow()
    }

    /// Verifies the credential and switches straight into admin mode.
    pub async fn login(&self, credential: &Credential) -> Result<Identity> {
        let identity = self.verifier.verify(credential).await?;

        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.identity.send_replace(Some(identity.clone()));
        self.state.admin_mode.send_replace(true);
        self.schedule_expiry(generation);

        Ok(identity)
    }

    /// Clears the identity. Never fails and is safe to call repeatedly.
    pub fn logout(&self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = self.take_expiry() {
            timer.abort();
        }
        if self.state.identity.borrow().is_some() {
            info!("admin logged out");
        }
        self.state.clear();
    }

    pub fn enter_admin_mode(&self) -> Result<()> {
        self.require_identity()?;
        self.state.admin_mode.send_replace(true);
        Ok(())
    }

    pub fn exit_admin_mode(&self) {
        self.state.admin_mode.send_replace(false);
    }

    fn schedule_expiry(&self, generation: u64) {
        let state = self.state.clone();
        let ttl = self.ttl;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if state.generation.load(Ordering::SeqCst) == generation {
                info!("admin session expired");
                state.clear();
            }
        });

        if let Some(previous) = self.replace_expiry(timer) {
            previous.abort();
        }
    }

    fn take_expiry(&self) -> Option<JoinHandle<()>> {
        self.expiry.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    fn replace_expiry(&self, timer: JoinHandle<()>) -> Option<JoinHandle<()>> {
        self.expiry
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .replace(timer)
    }
}

impl Drop for AdminSession {
    fn drop(&mut self) {
        if let Some(timer) = self.take_expiry() {
            timer.abort();
        }
    }
}
