use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::session::PlayerSession;

/// Players connected but not yet in a game. A pairing claim marks and
/// removes its two sessions under one lock, so concurrent passes can
/// never hand the same player to two games.
pub struct SessionRegistry {
    sessions: Mutex<Vec<Arc<PlayerSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, session: Arc<PlayerSession>) {
        self.sessions.lock().unwrap().push(session);
    }

    pub fn remove(&self, session: &Arc<PlayerSession>) {
        self.sessions
            .lock()
            .unwrap()
            .retain(|s| !Arc::ptr_eq(s, session));
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claims the two longest-waiting ready sessions, in connection order.
    pub fn take_two_ready(&self) -> Option<(Arc<PlayerSession>, Arc<PlayerSession>)> {
        let mut sessions = self.sessions.lock().unwrap();
        let ready: Vec<usize> = sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_ready() && !s.is_in_game())
            .map(|(i, _)| i)
            .take(2)
            .collect();
        let [first, second] = ready[..] else {
            return None;
        };
        // remove the later index first so the earlier one stays valid
        let b = sessions.remove(second);
        let a = sessions.remove(first);
        a.mark_in_game();
        b.mark_in_game();
        Some((a, b))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A game's id plus the completion flag shared with its driver task.
#[derive(Clone)]
pub struct GameHandle {
    id: String,
    over: Arc<AtomicBool>,
}

impl GameHandle {
    pub fn new(id: String, over: Arc<AtomicBool>) -> Self {
        GameHandle { id, over }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_over(&self) -> bool {
        self.over.load(Ordering::SeqCst)
    }
}

pub struct GameRegistry {
    games: Mutex<Vec<GameHandle>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        GameRegistry {
            games: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, handle: GameHandle) {
        self.games.lock().unwrap().push(handle);
    }

    pub fn len(&self) -> usize {
        self.games.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops finished games, returning their ids for the log.
    pub fn reap_finished(&self) -> Vec<String> {
        let mut games = self.games.lock().unwrap();
        let mut reaped = Vec::new();
        games.retain(|g| {
            if g.is_over() {
                reaped.push(g.id.clone());
                false
            } else {
                true
            }
        });
        reaped
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::testutil::{ready_session, session_pair};

    use super::*;

    #[tokio::test]
    async fn pairing_follows_connection_order() {
        let registry = SessionRegistry::new();
        let (a, _ca) = ready_session("a").await;
        let (b, _cb) = ready_session("b").await;
        let (c, _cc) = ready_session("c").await;
        registry.insert(a.clone());
        registry.insert(b.clone());
        registry.insert(c.clone());

        let (first, second) = registry.take_two_ready().unwrap();
        assert!(Arc::ptr_eq(&first, &a));
        assert!(Arc::ptr_eq(&second, &b));
        assert!(first.is_in_game());
        assert!(second.is_in_game());
        assert_eq!(registry.len(), 1);
        assert!(!c.is_in_game());
    }

    #[tokio::test]
    async fn sessions_without_a_username_are_skipped() {
        let registry = SessionRegistry::new();
        let (pending, _cp) = session_pair().await;
        let (a, _ca) = ready_session("a").await;
        let (b, _cb) = ready_session("b").await;
        registry.insert(pending.clone());
        registry.insert(a.clone());
        registry.insert(b.clone());

        let (first, second) = registry.take_two_ready().unwrap();
        assert!(Arc::ptr_eq(&first, &a));
        assert!(Arc::ptr_eq(&second, &b));
        assert_eq!(registry.len(), 1);
        assert!(!pending.is_in_game());
    }

    #[tokio::test]
    async fn a_single_ready_session_is_not_claimed() {
        let registry = SessionRegistry::new();
        let (pending, _cp) = session_pair().await;
        let (a, _ca) = ready_session("a").await;
        registry.insert(a);
        registry.insert(pending);

        assert!(registry.take_two_ready().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn odd_player_out_stays_in_the_registry() {
        let registry = SessionRegistry::new();
        let mut clients = Vec::new();
        for name in ["a", "b", "c"] {
            let (s, client) = ready_session(name).await;
            clients.push(client);
            registry.insert(s);
        }

        assert!(registry.take_two_ready().is_some());
        assert!(registry.take_two_ready().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_claims_never_share_a_session() {
        let registry = Arc::new(SessionRegistry::new());
        let mut clients = Vec::new();
        for i in 0..10 {
            let (s, client) = ready_session(&format!("p{i}")).await;
            clients.push(client);
            registry.insert(s);
        }

        let mut claims = Vec::new();
        for _ in 0..5 {
            let registry = registry.clone();
            claims.push(tokio::spawn(async move { registry.take_two_ready() }));
        }

        let mut seen = HashSet::new();
        for claim in claims {
            let (a, b) = claim.await.unwrap().expect("a pair for every claim");
            assert!(seen.insert(Arc::as_ptr(&a) as usize));
            assert!(seen.insert(Arc::as_ptr(&b) as usize));
        }
        assert_eq!(seen.len(), 10);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn remove_drops_exactly_the_given_session() {
        let registry = SessionRegistry::new();
        let (a, _ca) = ready_session("a").await;
        let (b, _cb) = ready_session("b").await;
        registry.insert(a.clone());
        registry.insert(b);
        registry.remove(&a);

        assert_eq!(registry.len(), 1);
        assert!(registry.take_two_ready().is_none());
    }

    #[test]
    fn reap_drops_only_finished_games() {
        let registry = GameRegistry::new();
        let done = Arc::new(AtomicBool::new(false));
        registry.insert(GameHandle::new("done".into(), done.clone()));
        registry.insert(GameHandle::new("live".into(), Arc::new(AtomicBool::new(false))));

        assert!(registry.reap_finished().is_empty());
        done.store(true, Ordering::SeqCst);
        assert_eq!(registry.reap_finished(), vec!["done".to_string()]);
        assert_eq!(registry.len(), 1);
    }
}
