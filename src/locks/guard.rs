//! Claims returned by `confirm` and their RAII guard.

use super::manager::LockManager;
use super::namespace::NodeId;
use crate::error::Result;
use tracing::warn;

/// One lock held by a claim. The token pins the identity of the lock, since
/// the node may be removed and its path locked again while the claim is out.
#[derive(Debug)]
pub(super) struct ClaimedLock {
    pub id: NodeId,
    pub token: String,
}

/// Locks held by a successful [`LockManager::confirm`].
///
/// A claim is released by passing it to [`LockManager::release`], which
/// consumes it. It cannot be cloned, so it cannot be released twice.
#[must_use = "claimed locks stay held until the claim is released"]
#[derive(Debug)]
pub struct Claim {
    locks: Vec<ClaimedLock>,
}

impl Claim {
    pub(super) fn new(locks: Vec<ClaimedLock>) -> Self {
        Self { locks }
    }

    pub(super) fn into_locks(self) -> Vec<ClaimedLock> {
        self.locks
    }

    /// Tokens of the claimed locks.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.locks.iter().map(|lock| lock.token.as_str())
    }

    /// Number of distinct locks claimed.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when no resource name was given to confirm.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// RAII guard for a [`Claim`].
///
/// When dropped, the claim is released. If release fails, a warning is
/// logged but no panic occurs.
#[derive(Debug)]
pub struct ClaimGuard<'a> {
    manager: &'a LockManager,
    claim: Option<Claim>,
}

impl<'a> ClaimGuard<'a> {
    pub(super) fn new(manager: &'a LockManager, claim: Claim) -> Self {
        Self {
            manager,
            claim: Some(claim),
        }
    }

    /// Tokens of the claimed locks.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.claim.iter().flat_map(|claim| claim.tokens())
    }

    /// Manually release the claim and observe the result.
    pub fn release(mut self) -> Result<()> {
        match self.claim.take() {
            Some(claim) => self.manager.release(claim),
            None => Ok(()),
        }
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if let Some(claim) = self.claim.take()
            && let Err(e) = self.manager.release(claim)
        {
            warn!(error = %e, "failed to release lock claim");
        }
    }
}
