//! Cancellation tokens for cooperative shutdown
//!
//! Load jobs and view sessions are cancelled cooperatively: the owner cancels
//! a token, and the worker checks it between steps and stops early. Tokens
//! can be linked so that cancelling a session also cancels every wait derived
//! from it.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Cancellation token for cooperative cancellation
///
/// Clones share the same underlying state: cancelling any clone cancels all
/// of them. A `child()` token additionally observes its parent's
/// cancellation, while cancelling the child leaves the parent untouched.
/// This is how a caller's bounded wait is linked to the session that owns it.
///
/// # Example
///
/// ```
/// use book_viewer_scheduler::CancellationToken;
///
/// let session = CancellationToken::new();
/// let wait = session.child();
///
/// session.cancel();
/// assert!(wait.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

struct TokenState {
    cancelled: AtomicBool,
    parent: Option<Arc<TokenState>>,
}

impl TokenState {
    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// Create a child token linked to this one.
    ///
    /// The child reports cancelled as soon as either itself or this token is
    /// cancelled. Cancelling the child does not propagate upward.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Cancel this token and all of its clones and children.
    ///
    /// Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Check whether this token, any clone of it, or any ancestor has been
    /// cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry associating job ids with cancellation tokens
///
/// The load scheduler uses this to cancel queued or running jobs by id when
/// a newer batch supersedes them.
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<crate::JobId, CancellationToken>>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Register a job and return its token.
    pub fn register(&self, job_id: crate::JobId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(job_id, token.clone());
        token
    }

    /// Cancel a job by id. Returns `true` if the job was registered.
    pub fn cancel(&self, job_id: crate::JobId) -> bool {
        let tokens = self.tokens.lock().unwrap();
        match tokens.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel several jobs by id. Returns how many were registered.
    pub fn cancel_many(&self, job_ids: &[crate::JobId]) -> usize {
        let tokens = self.tokens.lock().unwrap();
        job_ids
            .iter()
            .filter_map(|id| tokens.get(id))
            .map(|token| token.cancel())
            .count()
    }

    /// Cancel every registered job. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let tokens = self.tokens.lock().unwrap();
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }

    /// Remove a job from the registry (on completion or removal from the
    /// queue). Returns `true` if the job was registered.
    pub fn unregister(&self, job_id: crate::JobId) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.remove(&job_id).is_some()
    }

    /// Look up the token for a job.
    pub fn get(&self, job_id: crate::JobId) -> Option<CancellationToken> {
        let tokens = self.tokens.lock().unwrap();
        tokens.get(&job_id).cloned()
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        let tokens = self.tokens.lock().unwrap();
        tokens.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registration without cancelling the tokens.
    pub fn clear(&self) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.clear();
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        // Idempotent
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_token_clone_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_child_observes_parent() {
        let parent = CancellationToken::new();
        let child = parent.child();

        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_child_does_not_cancel_parent() {
        let parent = CancellationToken::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_grandchild_chain() {
        let root = CancellationToken::new();
        let grandchild = root.child().child();

        root.cancel();
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_registry_cancel() {
        let registry = CancellationRegistry::new();
        let token = registry.register(1);

        assert!(!token.is_cancelled());
        assert!(registry.cancel(1));
        assert!(token.is_cancelled());

        assert!(!registry.cancel(999));
    }

    #[test]
    fn test_registry_cancel_many() {
        let registry = CancellationRegistry::new();
        let a = registry.register(1);
        let b = registry.register(2);
        let c = registry.register(3);

        let cancelled = registry.cancel_many(&[1, 3, 999]);
        assert_eq!(cancelled, 2);
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(c.is_cancelled());
    }

    #[test]
    fn test_registry_cancel_all() {
        let registry = CancellationRegistry::new();
        let a = registry.register(1);
        let b = registry.register(2);

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_registry_unregister() {
        let registry = CancellationRegistry::new();
        registry.register(1);

        assert!(registry.unregister(1));
        assert!(!registry.unregister(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_get() {
        let registry = CancellationRegistry::new();
        let token = registry.register(7);

        let looked_up = registry.get(7).unwrap();
        token.cancel();
        assert!(looked_up.is_cancelled());

        assert!(registry.get(8).is_none());
    }

    #[test]
    fn test_registry_clear_keeps_tokens_alive() {
        let registry = CancellationRegistry::new();
        let token = registry.register(1);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!token.is_cancelled());
    }
}
