//! Conversation session storage
//!
//! Answer calls may carry a session id; the engine records the question
//! and the generated answer as turns so follow-up tooling can replay a
//! conversation. Storage is behind a trait so a persistent backend can
//! be dropped in without touching the engine.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::models::{Turn, TurnRole};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Turns recorded for the session, oldest first. Unknown sessions
    /// return an empty history.
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>>;

    /// Append a turn, evicting the oldest turns past the configured cap
    async fn append(&self, session_id: &str, role: TurnRole, content: &str) -> Result<()>;
}

/// In-process store backed by a map; history does not survive restarts
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
    max_turns: usize,
}

impl MemorySessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns: config.max_turns,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn append(&self, session_id: &str, role: TurnRole, content: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(Turn {
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        if turns.len() > self.max_turns {
            let excess = turns.len() - self.max_turns;
            turns.drain(..excess);
            debug!("Session {session_id} trimmed to {} turns", self.max_turns);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_turns: usize) -> MemorySessionStore {
        MemorySessionStore::new(&SessionConfig { max_turns })
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = store(10);
        assert!(store.history("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_turns_kept_in_order() {
        let store = store(10);
        store.append("s1", TurnRole::User, "question").await.unwrap();
        store.append("s1", TurnRole::Assistant, "answer").await.unwrap();

        let turns = store.history("s1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].content, "question");
        assert_eq!(turns[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store(10);
        store.append("a", TurnRole::User, "for a").await.unwrap();
        store.append("b", TurnRole::User, "for b").await.unwrap();

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert_eq!(store.history("b").await.unwrap()[0].content, "for b");
    }

    #[tokio::test]
    async fn test_oldest_turns_evicted_past_cap() {
        let store = store(3);
        for i in 0..5 {
            store
                .append("s1", TurnRole::User, &format!("turn {i}"))
                .await
                .unwrap();
        }

        let turns = store.history("s1").await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "turn 2");
        assert_eq!(turns[2].content, "turn 4");
    }
}
