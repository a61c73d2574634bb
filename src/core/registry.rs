//! Client sessions keyed by the id the presentation layer sends along.

use crate::config::AppConfig;
use crate::core::auth::AdminSession;
use crate::core::session::{ChatSession, SessionSettings};
use crate::core::traits::SuggestionStore;
use crate::core::vocabulary::VocabularyPool;
use crate::infrastructure::traits::{
    ConversationLogRepository, CredentialVerifier, TranslationBackend,
};
use crate::{Error, Result};
use di::{Ref, inject, injectable};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uuid::Uuid;

const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Everything one browser client owns.
pub struct ClientSession {
    pub chat: ChatSession,
    pub admin: AdminSession,
    last_seen: Mutex<Instant>,
}

impl ClientSession {
    pub fn id(&self) -> Uuid {
        self.chat.id()
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|p| p.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .elapsed()
    }

    /// An open event stream or a pending reply keeps the session alive.
    fn in_use(&self) -> bool {
        self.chat.watcher_count() > 0
            || self.admin.watcher_count() > 0
            || self.chat.in_flight() > 0
    }

    /// Logging out closes every admin view fed by this session's identity.
    fn close(&self) {
        self.admin.logout();
    }
}

pub struct SessionRegistry {
    config: Ref<AppConfig>,
    backend: Ref<dyn TranslationBackend>,
    conversations: Ref<dyn ConversationLogRepository>,
    suggestions: Ref<dyn SuggestionStore>,
    vocabulary: Ref<VocabularyPool>,
    verifier: Ref<dyn CredentialVerifier>,
    sessions: RwLock<HashMap<Uuid, Arc<ClientSession>>>,
}

#[injectable]
impl SessionRegistry {
    #[inject]
    pub fn create(
        config: Ref<AppConfig>,
        backend: Ref<dyn TranslationBackend>,
        conversations: Ref<dyn ConversationLogRepository>,
        suggestions: Ref<dyn SuggestionStore>,
        vocabulary: Ref<VocabularyPool>,
        verifier: Ref<dyn CredentialVerifier>,
    ) -> SessionRegistry {
        SessionRegistry {
            config,
            backend,
            conversations,
            suggestions,
            vocabulary,
            verifier,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl SessionRegistry {
    pub fn open_session(&self) -> Arc<ClientSession> {
        let id = Uuid::new_v4();
        let session = Arc::new(ClientSession {
            chat: ChatSession::new(
                id,
                self.backend.clone(),
                self.conversations.clone(),
                self.suggestions.clone(),
                self.vocabulary.clone(),
                SessionSettings {
                    client_tag: self.config.client_tag.clone(),
                    forward_vocabulary: self.config.forward_vocabulary,
                },
            ),
            admin: AdminSession::new(self.verifier.clone(), self.config.session_ttl),
            last_seen: Mutex::new(Instant::now()),
        });

        self.sessions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, session.clone());
        info!("session {id} opened");

        session
    }

    /// Looks a session up and marks it as seen.
    pub fn get(&self, id: Uuid) -> Result<Arc<ClientSession>> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))?;

        session.touch();
        Ok(session)
    }

    /// Tears a session down. Returns `false` if it was already gone.
    pub fn end_session(&self, id: Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&id);

        match removed {
            Some(session) => {
                session.close();
                info!("session {id} ended");
                true
            }
            None => false,
        }
    }

    /// Ends sessions nobody has used for longer than `max_idle`. Returns how
    /// many were ended.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let idle: Vec<Uuid> = self
            .sessions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|session| !session.in_use() && session.idle_for() > max_idle)
            .map(|session| session.id())
            .collect();

        let ended = idle.into_iter().filter(|id| self.end_session(*id)).count();
        if ended > 0 {
            info!("ended {ended} idle sessions");
        }
        ended
    }

    /// Periodically ends idle sessions. The task stops once the registry is
    /// dropped.
    pub fn spawn_idle_sweep(registry: &Ref<SessionRegistry>) -> JoinHandle<()> {
        let max_idle = registry.config.session_idle_timeout;
        let period = (max_idle / 4).max(MIN_SWEEP_PERIOD);
        let registry = Arc::downgrade(registry);

        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.sweep_idle(max_idle);
            }
            debug!("idle session sweep stopped");
        })
    }

    /// Ends every session, used on shutdown.
    pub fn end_all(&self) {
        let sessions: Vec<_> = self
            .sessions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .drain()
            .map(|(_, session)| session)
            .collect();

        for session in &sessions {
            session.close();
        }
        info!("ended {} sessions", sessions.len());
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
