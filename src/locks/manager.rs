//! The in-memory lock manager.

use super::expiry::ExpiryQueue;
use super::guard::{Claim, ClaimGuard, ClaimedLock};
use super::namespace::{LockNode, Namespace, NodeId};
use super::tokens::TokenRegistry;
use super::types::{Condition, LockDetails, LockInfo};
use crate::config::ManagerConfig;
use crate::error::{DavLockError, Result};
use crate::path::{ancestors, slash_clean};
use crate::timeout::LockTimeout;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

/// Everything guarded by the manager's critical section.
#[derive(Debug)]
struct State {
    namespace: Namespace,
    tokens: TokenRegistry,
    /// Finite-duration locks that are neither held nor expired.
    expiry: ExpiryQueue,
}

impl State {
    fn new(seed: u64) -> Self {
        Self {
            namespace: Namespace::default(),
            tokens: TokenRegistry::new(seed),
            expiry: ExpiryQueue::default(),
        }
    }

    /// Remove every lock whose expiry is at or before `now`.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let mut expired = 0usize;
        while let Some((id, at)) = self.expiry.peek() {
            if now < at {
                break;
            }
            self.remove(id);
            expired += 1;
        }
        if expired > 0 {
            debug!(count = expired, pending = self.expiry.len(), "expired locks swept");
        }
    }

    /// Remove an explicit lock: deregister its token, drop it from the expiry
    /// queue, and release its reference on the namespace chain.
    fn remove(&mut self, id: NodeId) {
        self.expiry.remove(id);
        let Some(node) = self.namespace.get_mut(id) else {
            return;
        };
        if let Some(token) = node.token.take() {
            self.tokens.remove(&token);
        }
        node.held = false;
        node.expiry = None;
        let root = node.details.root.clone();
        self.namespace.release_chain(&root);
    }

    /// Node for a live token.
    fn by_token(&self, token: &str) -> Result<NodeId> {
        self.tokens.get(token).ok_or(DavLockError::NoSuchLock)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut LockNode> {
        self.namespace
            .get_mut(id)
            .ok_or_else(|| fault("token registered for a missing node".to_string()))
    }

    /// First condition whose lock is not held and covers `name`: the lock is
    /// rooted at `name`, or is an infinite-depth lock on an ancestor of it.
    fn lookup(&self, name: &str, conditions: &[Condition]) -> Option<NodeId> {
        conditions.iter().find_map(|condition| {
            let id = self.tokens.get(&condition.token)?;
            let node = self.namespace.get(id)?;
            if node.held {
                return None;
            }
            let root = node.details.root.as_str();
            if name == root {
                return Some(id);
            }
            if node.details.zero_depth {
                return None;
            }
            let covers = root == "/"
                || name
                    .strip_prefix(root)
                    .is_some_and(|rest| rest.starts_with('/'));
            covers.then_some(id)
        })
    }

    fn hold(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.held {
            return Err(fault(format!("lock on '{}' is already held", node.details.root)));
        }
        node.held = true;
        self.expiry.remove(id);
        Ok(())
    }

    fn unhold(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if !node.held {
            return Err(fault(format!("lock on '{}' is not held", node.details.root)));
        }
        node.held = false;
        let expiry = node.expiry;
        if let Some(at) = expiry {
            self.expiry.push(id, at);
        }
        Ok(())
    }

    /// Hold every node in `ids`. If one fails, the holds already taken are
    /// undone and the first error is returned.
    fn hold_all(&mut self, ids: &[NodeId]) -> Result<()> {
        for (i, &id) in ids.iter().enumerate() {
            if let Err(e) = self.hold(id) {
                for &prev in &ids[..i] {
                    if let Err(rollback) = self.unhold(prev) {
                        warn!(error = %rollback, "failed to undo hold after confirm fault");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Whether `id` still carries the lock identified by `token`.
    fn still_locked_by(&self, id: NodeId, token: &str) -> bool {
        self.namespace
            .get(id)
            .is_some_and(|node| node.token.as_deref() == Some(token))
    }
}

/// Log and build an internal fault.
fn fault(message: String) -> DavLockError {
    error!(%message, "lock manager invariant violated");
    DavLockError::Internal(message)
}

/// In-memory lock manager for a hierarchical resource namespace.
///
/// Every operation runs under one exclusive critical section and starts by
/// sweeping locks that expired at or before the `now` it was given. Nothing
/// runs in the background; time only moves through those arguments.
#[derive(Debug)]
pub struct LockManager {
    state: Mutex<State>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    /// Create a manager whose token counter is seeded from the wall clock.
    pub fn new() -> Self {
        Self::with_token_seed(Utc::now().timestamp().max(0) as u64)
    }

    /// Create a manager with a fixed token seed. Tokens start at `seed + 1`.
    pub fn with_token_seed(seed: u64) -> Self {
        Self {
            state: Mutex::new(State::new(seed)),
        }
    }

    /// Create a manager from configuration.
    pub fn with_config(config: &ManagerConfig) -> Self {
        match config.token_seed {
            Some(seed) => Self::with_token_seed(seed),
            None => Self::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Create a lock described by `details`.
    ///
    /// `details.root` is normalized before use.
    ///
    /// # Returns
    ///
    /// * `Ok(token)` - The new lock's token
    /// * `Err(DavLockError::Locked)` - An existing lock conflicts
    pub fn create(&self, now: DateTime<Utc>, mut details: LockDetails) -> Result<String> {
        let mut state = self.state();
        state.sweep(now);
        details.root = slash_clean(&details.root);

        if !state.namespace.can_create(&details.root, details.zero_depth) {
            debug!(root = %details.root, "lock conflicts with an existing lock");
            return Err(DavLockError::Locked);
        }

        let id = state.namespace.create(&details.root);
        let token = state.tokens.next_token();
        state.tokens.register(token.clone(), id);

        let expiry = details.duration.expiry_from(now);
        let node = state.node_mut(id)?;
        debug!(root = %details.root, %token, zero_depth = details.zero_depth, timeout = %details.duration, "lock created");
        node.token = Some(token.clone());
        node.details = details;
        node.expiry = expiry;
        node.held = false;
        if let Some(at) = expiry {
            state.expiry.push(id, at);
        }
        Ok(token)
    }

    /// Restart the lock identified by `token` with a new duration.
    ///
    /// # Returns
    ///
    /// * `Ok(LockDetails)` - The refreshed lock's metadata
    /// * `Err(DavLockError::NoSuchLock)` - Unknown or expired token
    /// * `Err(DavLockError::Locked)` - The lock is held by a confirm
    pub fn refresh(
        &self,
        now: DateTime<Utc>,
        token: &str,
        duration: LockTimeout,
    ) -> Result<LockDetails> {
        let mut state = self.state();
        state.sweep(now);

        let id = state.by_token(token)?;
        let node = state.node_mut(id)?;
        if node.held {
            return Err(DavLockError::Locked);
        }
        node.details.duration = duration;
        node.expiry = duration.expiry_from(now);
        let expiry = node.expiry;
        let details = node.details.clone();

        state.expiry.remove(id);
        if let Some(at) = expiry {
            state.expiry.push(id, at);
        }
        debug!(%token, timeout = %duration, "lock refreshed");
        Ok(details)
    }

    /// Remove the lock identified by `token`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The lock is gone
    /// * `Err(DavLockError::NoSuchLock)` - Unknown or expired token
    /// * `Err(DavLockError::Locked)` - The lock is held by a confirm
    pub fn unlock(&self, now: DateTime<Utc>, token: &str) -> Result<()> {
        let mut state = self.state();
        state.sweep(now);

        let id = state.by_token(token)?;
        if state.node_mut(id)?.held {
            return Err(DavLockError::Locked);
        }
        state.remove(id);
        debug!(%token, "lock removed");
        Ok(())
    }

    /// Claim the locks that give access to up to two resources.
    ///
    /// For each non-empty name, the first condition naming a non-held lock
    /// that covers the name is claimed. Claimed locks cannot expire, be
    /// confirmed again, refreshed, or unlocked until the claim is passed to
    /// [`release`](Self::release).
    ///
    /// # Returns
    ///
    /// * `Ok(Claim)` - All named resources are claimed
    /// * `Err(DavLockError::ConfirmationFailed)` - Some name has no matching
    ///   condition; try another condition set
    /// * `Err(DavLockError::Internal)` - Internal fault
    pub fn confirm(
        &self,
        now: DateTime<Utc>,
        name0: &str,
        name1: &str,
        conditions: &[Condition],
    ) -> Result<Claim> {
        let mut state = self.state();
        state.sweep(now);

        let mut resolved: Vec<NodeId> = Vec::with_capacity(2);
        for name in [name0, name1] {
            if name.is_empty() {
                continue;
            }
            let id = state
                .lookup(&slash_clean(name), conditions)
                .ok_or(DavLockError::ConfirmationFailed)?;
            // Both names may resolve to one lock; hold it once.
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }

        state.hold_all(&resolved)?;

        let mut locks = Vec::with_capacity(resolved.len());
        for id in resolved {
            let node = state.node_mut(id)?;
            let token = node.token.clone().unwrap_or_default();
            debug!(root = %node.details.root, %token, "lock claimed");
            locks.push(ClaimedLock { id, token });
        }
        Ok(Claim::new(locks))
    }

    /// Like [`confirm`](Self::confirm), but the claim is released when the
    /// returned guard drops.
    pub fn confirm_guard(
        &self,
        now: DateTime<Utc>,
        name0: &str,
        name1: &str,
        conditions: &[Condition],
    ) -> Result<ClaimGuard<'_>> {
        let claim = self.confirm(now, name0, name1, conditions)?;
        Ok(ClaimGuard::new(self, claim))
    }

    /// Release a claim returned by [`confirm`](Self::confirm).
    ///
    /// Locks removed while claimed (for example by [`delete`](Self::delete))
    /// are skipped. Finite-duration locks go back into the expiry queue with
    /// their original expiry.
    pub fn release(&self, claim: Claim) -> Result<()> {
        let mut state = self.state();
        let mut outcome = Ok(());
        for lock in claim.into_locks().into_iter().rev() {
            if !state.still_locked_by(lock.id, &lock.token) {
                debug!(token = %lock.token, "claimed lock was removed before release");
                continue;
            }
            match state.unhold(lock.id) {
                Ok(()) => debug!(token = %lock.token, "claim released"),
                Err(e) => {
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
        }
        outcome
    }

    /// Find the lock covering `name`, sweeping with the current wall clock.
    pub fn get_by_name(&self, name: &str) -> Result<LockInfo> {
        self.get_by_name_at(Utc::now(), name)
    }

    /// Find the lock covering `name` as of `now`.
    ///
    /// Walks from `name` up to `/` and reports the nearest lock rooted at
    /// `name` itself or an infinite-depth lock on an ancestor.
    ///
    /// # Returns
    ///
    /// * `Ok(LockInfo)` - The covering lock
    /// * `Err(DavLockError::NoSuchLock)` - Nothing covers `name`
    pub fn get_by_name_at(&self, now: DateTime<Utc>, name: &str) -> Result<LockInfo> {
        let mut state = self.state();
        state.sweep(now);

        let name = slash_clean(name);
        for (depth, level) in ancestors(&name).enumerate() {
            let Some(node) = state.namespace.find(level).and_then(|id| state.namespace.get(id))
            else {
                continue;
            };
            let Some(token) = &node.token else {
                continue;
            };
            if depth > 0 && node.details.zero_depth {
                continue;
            }
            return Ok(LockInfo {
                token: token.clone(),
                expiry: node.expiry,
                details: node.details.clone(),
            });
        }
        Err(DavLockError::NoSuchLock)
    }

    /// Remove the lock rooted exactly at `name`, if any.
    ///
    /// Called when a resource is deleted outside the lock protocol. Missing
    /// locks are not an error. Nodes that only anchor descendant locks are left
    /// alone.
    pub fn delete(&self, now: DateTime<Utc>, name: &str) -> Result<()> {
        let mut state = self.state();
        state.sweep(now);

        let name = slash_clean(name);
        let Some(id) = state.namespace.find(&name) else {
            return Ok(());
        };
        let explicit = state
            .namespace
            .get(id)
            .is_some_and(|node| node.token.is_some());
        if explicit {
            state.remove(id);
            debug!(root = %name, nodes = state.namespace.len(), "lock removed by delete hook");
        }
        Ok(())
    }

    /// Number of explicit locks, including ones that expired but have not
    /// been swept yet.
    pub fn len(&self) -> usize {
        self.state().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of explicit locks still alive at `now`.
    pub fn lock_count_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state();
        state.sweep(now);
        state.tokens.len()
    }

    #[cfg(test)]
    pub(crate) fn materialized_nodes(&self) -> usize {
        self.state().namespace.len()
    }

    #[cfg(test)]
    pub(crate) fn queued_expiries(&self) -> usize {
        self.state().expiry.len()
    }

    #[cfg(test)]
    pub(crate) fn is_queued(&self, token: &str) -> bool {
        let state = self.state();
        state
            .tokens
            .get(token)
            .is_some_and(|id| state.expiry.contains(id))
    }
}
