//! In-memory storage implementation
//!
//! Reference backend for tests and development. A single mutex over the whole
//! state makes each commit an indivisible unit: preconditions are validated
//! and writes applied without releasing the lock, so commits to any document
//! are linearizable and a failed batch leaves nothing behind.

use std::collections::HashMap;
use tokio::sync::Mutex;

use async_trait::async_trait;

use super::{LedgerStore, Versioned, Write};
use crate::error::{LedgerError, LedgerResult};
use crate::types::{
    participant_key, AppSettings, EntryId, EntryStatus, EntryType, LedgerEntry, Participant,
    Tournament, TournamentId, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, Versioned<User>>,
    tournaments: HashMap<TournamentId, Versioned<Tournament>>,
    participants: HashMap<String, Participant>,
    entries: HashMap<EntryId, Versioned<LedgerEntry>>,
    settings: Option<Versioned<AppSettings>>,
}

impl State {
    fn check(&self, write: &Write) -> LedgerResult<()> {
        write.validate()?;
        match write {
            Write::User { id, expect, .. } => {
                let current = self.users.get(id).map(|v| v.version).unwrap_or(0);
                if current != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "users",
                    });
                }
            }
            Write::Tournament { id, expect, .. } => {
                let current = self.tournaments.get(id).map(|v| v.version).unwrap_or(0);
                if current != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "tournaments",
                    });
                }
            }
            Write::Participant { doc } => {
                if self.participants.contains_key(&doc.key()) {
                    return Err(LedgerError::AlreadyJoined);
                }
            }
            Write::Entry { id, expect, .. } => {
                let current = self.entries.get(id).map(|v| v.version).unwrap_or(0);
                if current != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "transactions",
                    });
                }
            }
            Write::Settings { expect, .. } => {
                let current = self.settings.as_ref().map(|v| v.version).unwrap_or(0);
                if current != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "settings",
                    });
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::User { id, doc, expect } => {
                self.users.insert(id, Versioned::new(expect + 1, doc));
            }
            Write::Tournament { id, doc, expect } => {
                self.tournaments.insert(id, Versioned::new(expect + 1, doc));
            }
            Write::Participant { doc } => {
                self.participants.insert(doc.key(), doc);
            }
            Write::Entry { id, doc, expect } => {
                self.entries.insert(id, Versioned::new(expect + 1, doc));
            }
            Write::Settings { doc, expect } => {
                self.settings = Some(Versioned::new(expect + 1, doc));
            }
        }
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all data
    pub async fn clear(&self) {
        *self.state.lock().await = State::default();
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_user(&self, id: &UserId) -> LedgerResult<Option<Versioned<User>>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn get_tournament(
        &self,
        id: &TournamentId,
    ) -> LedgerResult<Option<Versioned<Tournament>>> {
        Ok(self.state.lock().await.tournaments.get(id).cloned())
    }

    async fn get_participant(
        &self,
        tournament_id: &TournamentId,
        user_id: &UserId,
    ) -> LedgerResult<Option<Participant>> {
        let key = participant_key(tournament_id, user_id);
        Ok(self.state.lock().await.participants.get(&key).cloned())
    }

    async fn get_entry(&self, id: &EntryId) -> LedgerResult<Option<Versioned<LedgerEntry>>> {
        Ok(self.state.lock().await.entries.get(id).cloned())
    }

    async fn get_settings(&self) -> LedgerResult<Versioned<AppSettings>> {
        Ok(self
            .state
            .lock()
            .await
            .settings
            .clone()
            .unwrap_or_else(|| Versioned::new(0, AppSettings::default())))
    }

    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> LedgerResult<Option<(UserId, Versioned<User>)>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|(_, v)| v.doc.referral_code == code)
            .map(|(id, v)| (id.clone(), v.clone())))
    }

    async fn list_entries(
        &self,
        entry_type: EntryType,
        status: EntryStatus,
    ) -> LedgerResult<Vec<(EntryId, LedgerEntry)>> {
        let state = self.state.lock().await;
        let mut entries: Vec<(EntryId, LedgerEntry)> = state
            .entries
            .iter()
            .filter(|(_, v)| v.doc.entry_type == entry_type && v.doc.status == status)
            .map(|(id, v)| (id.clone(), v.doc.clone()))
            .collect();
        entries.sort_by_key(|(_, e)| e.created_at);
        Ok(entries)
    }

    async fn commit(&self, writes: Vec<Write>) -> LedgerResult<()> {
        let mut state = self.state.lock().await;

        // Validate the whole batch before touching anything.
        super::check_batch_keys(&writes)?;
        for write in &writes {
            state.check(write)?;
        }
        for write in writes {
            state.apply(write);
        }
        Ok(())
    }
}
