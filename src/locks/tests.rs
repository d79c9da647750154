//! Tests for the locks subsystem.

use super::*;
use crate::error::DavLockError;
use crate::timeout::LockTimeout;
use chrono::{DateTime, Duration, Utc};

fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

fn infinite(root: &str) -> LockDetails {
    LockDetails::new(root, LockTimeout::Infinite, false)
}

fn zero(root: &str) -> LockDetails {
    LockDetails::new(root, LockTimeout::Infinite, true)
}

fn manager() -> LockManager {
    LockManager::with_token_seed(100)
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn test_create_returns_fresh_tokens() {
    let m = manager();
    let a = m.create(t0(), zero("/a")).unwrap();
    let b = m.create(t0(), zero("/b")).unwrap();

    assert_eq!(a, "101");
    assert_eq!(b, "102");
    assert_eq!(m.len(), 2);
}

#[test]
fn test_zero_depth_locks_on_same_path_conflict() {
    let m = manager();
    m.create(t0(), zero("/a")).unwrap();

    assert_eq!(m.create(t0(), zero("/a")), Err(DavLockError::Locked));
    assert_eq!(m.create(t0(), infinite("/a")), Err(DavLockError::Locked));
}

#[test]
fn test_create_normalizes_root() {
    let m = manager();
    m.create(t0(), zero("a//b/./")).unwrap();

    assert_eq!(m.create(t0(), zero("/a/b")), Err(DavLockError::Locked));
    let info = m.get_by_name_at(t0(), "/a/b").unwrap();
    assert_eq!(info.details.root, "/a/b");
}

#[test]
fn test_infinite_lock_blocks_descendants() {
    let m = manager();
    m.create(t0(), infinite("/a")).unwrap();

    assert_eq!(m.create(t0(), zero("/a/b")), Err(DavLockError::Locked));
    assert_eq!(m.create(t0(), infinite("/a/c/d")), Err(DavLockError::Locked));
    // Siblings are unaffected.
    assert!(m.create(t0(), zero("/ab")).is_ok());
}

#[test]
fn test_zero_depth_lock_allows_descendants() {
    let m = manager();
    m.create(t0(), zero("/a")).unwrap();

    assert!(m.create(t0(), zero("/a/b")).is_ok());
    assert!(m.create(t0(), infinite("/a/c")).is_ok());
}

#[test]
fn test_infinite_lock_rejected_over_locked_descendant() {
    let m = manager();
    m.create(t0(), zero("/a/b/c")).unwrap();

    assert_eq!(m.create(t0(), infinite("/a")), Err(DavLockError::Locked));
    assert_eq!(m.create(t0(), infinite("/")), Err(DavLockError::Locked));
    assert!(m.create(t0(), zero("/a")).is_ok());
}

#[test]
fn test_root_infinite_lock_covers_everything() {
    let m = manager();
    m.create(t0(), infinite("/")).unwrap();

    assert_eq!(m.create(t0(), zero("/x")), Err(DavLockError::Locked));
    assert_eq!(m.create(t0(), zero("/x/y/z")), Err(DavLockError::Locked));
}

// ============================================================================
// Refresh / Unlock
// ============================================================================

#[test]
fn test_unlock_succeeds_once() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();

    assert_eq!(m.unlock(t0(), &token), Ok(()));
    assert_eq!(m.unlock(t0(), &token), Err(DavLockError::NoSuchLock));
    assert!(m.is_empty());
    assert_eq!(m.materialized_nodes(), 0);
}

#[test]
fn test_unlock_keeps_anchor_for_remaining_descendants() {
    let m = manager();
    let parent = m.create(t0(), zero("/a")).unwrap();
    m.create(t0(), zero("/a/b")).unwrap();

    m.unlock(t0(), &parent).unwrap();

    // "/a" still anchors "/a/b", so an infinite lock there is rejected.
    assert_eq!(m.create(t0(), infinite("/a")), Err(DavLockError::Locked));
    assert!(m.create(t0(), zero("/a")).is_ok());
}

#[test]
fn test_refresh_unknown_token() {
    let m = manager();
    assert_eq!(
        m.refresh(t0(), "nope", LockTimeout::seconds(10)),
        Err(DavLockError::NoSuchLock)
    );
}

#[test]
fn test_refresh_extends_expiry() {
    let m = manager();
    let token = m
        .create(t0(), LockDetails::new("/a", LockTimeout::seconds(10), true))
        .unwrap();

    let details = m
        .refresh(t0() + Duration::seconds(8), &token, LockTimeout::seconds(10))
        .unwrap();
    assert_eq!(details.duration, LockTimeout::seconds(10));
    assert_eq!(details.root, "/a");

    // Originally due at t0+10; now due at t0+18.
    let info = m.get_by_name_at(t0() + Duration::seconds(15), "/a").unwrap();
    assert_eq!(info.expiry, Some(t0() + Duration::seconds(18)));
    assert_eq!(
        m.get_by_name_at(t0() + Duration::seconds(18), "/a"),
        Err(DavLockError::NoSuchLock)
    );
}

#[test]
fn test_refresh_to_infinite_leaves_expiry_queue() {
    let m = manager();
    let token = m
        .create(t0(), LockDetails::new("/a", LockTimeout::seconds(10), true))
        .unwrap();
    assert!(m.is_queued(&token));

    m.refresh(t0(), &token, LockTimeout::Infinite).unwrap();
    assert!(!m.is_queued(&token));

    let info = m.get_by_name_at(t0() + Duration::days(365), "/a").unwrap();
    assert_eq!(info.expiry, None);
}

#[test]
fn test_refresh_and_unlock_of_held_lock_are_locked() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();
    let claim = m
        .confirm(t0(), "/a", "", &[Condition::token(&token)])
        .unwrap();

    assert_eq!(
        m.refresh(t0(), &token, LockTimeout::seconds(5)),
        Err(DavLockError::Locked)
    );
    assert_eq!(m.unlock(t0(), &token), Err(DavLockError::Locked));

    m.release(claim).unwrap();
    assert!(m.refresh(t0(), &token, LockTimeout::seconds(5)).is_ok());
    assert_eq!(m.unlock(t0(), &token), Ok(()));
}

// ============================================================================
// Confirm / Release
// ============================================================================

#[test]
fn test_confirm_through_infinite_ancestor() {
    let m = manager();
    let token = m.create(t0(), infinite("/a")).unwrap();
    let conditions = [Condition::token(&token)];

    let claim = m.confirm(t0(), "/a/b/c", "", &conditions).unwrap();
    assert_eq!(claim.tokens().collect::<Vec<_>>(), vec![token.as_str()]);

    assert_eq!(
        m.confirm(t0(), "/a/b", "", &conditions).unwrap_err(),
        DavLockError::ConfirmationFailed
    );

    m.release(claim).unwrap();
    let again = m.confirm(t0(), "/a/b", "", &conditions).unwrap();
    m.release(again).unwrap();
}

#[test]
fn test_confirm_zero_depth_ancestor_does_not_match() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();

    let err = m
        .confirm(t0(), "/a/b", "", &[Condition::token(&token)])
        .unwrap_err();
    assert_eq!(err, DavLockError::ConfirmationFailed);
    assert!(err.is_retryable());
}

#[test]
fn test_confirm_requires_path_boundary() {
    let m = manager();
    let token = m.create(t0(), infinite("/a")).unwrap();

    assert_eq!(
        m.confirm(t0(), "/ab", "", &[Condition::token(&token)])
            .unwrap_err(),
        DavLockError::ConfirmationFailed
    );
}

#[test]
fn test_confirm_root_lock_covers_any_name() {
    let m = manager();
    let token = m.create(t0(), infinite("/")).unwrap();

    let claim = m
        .confirm(t0(), "/deep/er/name", "", &[Condition::token(&token)])
        .unwrap();
    assert_eq!(claim.len(), 1);
    m.release(claim).unwrap();
}

#[test]
fn test_confirm_uses_first_matching_condition() {
    let m = manager();
    let a = m.create(t0(), zero("/a")).unwrap();
    let b = m.create(t0(), zero("/b")).unwrap();

    let conditions = [
        Condition::token("unknown"),
        Condition::token(&a),
        Condition::token(&b),
    ];
    let claim = m.confirm(t0(), "/b", "/a", &conditions).unwrap();

    let mut tokens: Vec<&str> = claim.tokens().collect();
    tokens.sort();
    assert_eq!(tokens, vec![a.as_str(), b.as_str()]);
    m.release(claim).unwrap();
}

#[test]
fn test_confirm_same_lock_for_both_names_holds_once() {
    let m = manager();
    let token = m.create(t0(), infinite("/dir")).unwrap();

    let claim = m
        .confirm(t0(), "/dir/src", "/dir/dst", &[Condition::token(&token)])
        .unwrap();
    assert_eq!(claim.len(), 1);
    assert_eq!(m.release(claim), Ok(()));
}

#[test]
fn test_confirm_fails_if_any_name_unmatched() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();

    assert_eq!(
        m.confirm(t0(), "/a", "/other", &[Condition::token(&token)])
            .unwrap_err(),
        DavLockError::ConfirmationFailed
    );
    // Nothing was held by the failed attempt.
    let claim = m
        .confirm(t0(), "/a", "", &[Condition::token(&token)])
        .unwrap();
    m.release(claim).unwrap();
}

#[test]
fn test_confirm_with_no_names_is_empty_claim() {
    let m = manager();
    let claim = m.confirm(t0(), "", "", &[]).unwrap();
    assert!(claim.is_empty());
    m.release(claim).unwrap();
}

#[test]
fn test_condition_etag_and_not_are_ignored() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();

    let etag_only = Condition {
        etag: "\"abc\"".to_string(),
        ..Condition::default()
    };
    assert_eq!(
        m.confirm(t0(), "/a", "", &[etag_only]).unwrap_err(),
        DavLockError::ConfirmationFailed
    );

    let negated = Condition {
        not: true,
        ..Condition::token(&token)
    };
    let claim = m.confirm(t0(), "/a", "", &[negated]).unwrap();
    m.release(claim).unwrap();
}

#[test]
fn test_held_lock_does_not_expire() {
    let m = manager();
    let token = m
        .create(t0(), LockDetails::new("/a", LockTimeout::seconds(10), true))
        .unwrap();
    let claim = m
        .confirm(t0(), "/a", "", &[Condition::token(&token)])
        .unwrap();
    assert!(!m.is_queued(&token));

    let later = t0() + Duration::seconds(60);
    assert!(m.get_by_name_at(later, "/a").is_ok());
    assert_eq!(m.lock_count_at(later), 1);

    m.release(claim).unwrap();
    assert!(m.is_queued(&token));
    // Back in the queue with its original expiry, which has passed.
    assert_eq!(
        m.get_by_name_at(later, "/a"),
        Err(DavLockError::NoSuchLock)
    );
    assert_eq!(m.queued_expiries(), 0);
}

#[test]
fn test_claim_guard_releases_on_drop() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();
    let conditions = [Condition::token(&token)];

    {
        let guard = m.confirm_guard(t0(), "/a", "", &conditions).unwrap();
        assert_eq!(guard.tokens().count(), 1);
        assert_eq!(
            m.confirm(t0(), "/a", "", &conditions).unwrap_err(),
            DavLockError::ConfirmationFailed
        );
    }

    let guard = m.confirm_guard(t0(), "/a", "", &conditions).unwrap();
    assert_eq!(guard.release(), Ok(()));
    assert_eq!(m.unlock(t0(), &token), Ok(()));
}

#[test]
fn test_release_after_delete_skips_removed_lock() {
    let m = manager();
    let token = m.create(t0(), zero("/a")).unwrap();
    let claim = m
        .confirm(t0(), "/a", "", &[Condition::token(&token)])
        .unwrap();

    m.delete(t0(), "/a").unwrap();
    // The path is free again and can be re-locked before release runs.
    let replacement = m.create(t0(), zero("/a")).unwrap();

    assert_eq!(m.release(claim), Ok(()));
    // The replacement lock was never held.
    assert_eq!(m.unlock(t0(), &replacement), Ok(()));
}

// ============================================================================
// Expiry
// ============================================================================

#[test]
fn test_lock_expires_after_duration() {
    let m = manager();
    let d = 30;
    m.create(t0(), LockDetails::new("/a", LockTimeout::seconds(d), true))
        .unwrap();
    let eps = Duration::milliseconds(1);
    let due = t0() + Duration::seconds(i64::from(d));

    assert!(m.get_by_name_at(due - eps, "/a").is_ok());
    assert_eq!(
        m.get_by_name_at(due + eps, "/a"),
        Err(DavLockError::NoSuchLock)
    );
    assert!(m.create(due + eps, zero("/a")).is_ok());
}

#[test]
fn test_expiry_is_inclusive_of_due_instant() {
    let m = manager();
    let token = m
        .create(t0(), LockDetails::new("/a", LockTimeout::seconds(5), true))
        .unwrap();

    assert_eq!(
        m.unlock(t0() + Duration::seconds(5), &token),
        Err(DavLockError::NoSuchLock)
    );
}

#[test]
fn test_expired_ancestor_unblocks_descendants() {
    let m = manager();
    m.create(t0(), LockDetails::new("/a", LockTimeout::seconds(5), false))
        .unwrap();

    assert_eq!(m.create(t0(), zero("/a/b")), Err(DavLockError::Locked));
    assert!(m.create(t0() + Duration::seconds(6), zero("/a/b")).is_ok());
}

#[test]
fn test_sweep_removes_in_expiry_order() {
    let m = manager();
    for (root, secs) in [("/c", 30), ("/a", 10), ("/b", 20), ("/d", 40)] {
        m.create(t0(), LockDetails::new(root, LockTimeout::seconds(secs), true))
            .unwrap();
    }
    m.create(t0(), zero("/forever")).unwrap();

    assert_eq!(m.lock_count_at(t0() + Duration::seconds(15)), 4);
    assert_eq!(m.lock_count_at(t0() + Duration::seconds(35)), 2);
    assert_eq!(m.lock_count_at(t0() + Duration::seconds(1_000)), 1);
    assert_eq!(m.queued_expiries(), 0);
}

#[test]
fn test_expired_locks_stay_materialized_until_next_operation() {
    let m = manager();
    m.create(t0(), LockDetails::new("/a/b", LockTimeout::seconds(1), true))
        .unwrap();

    assert_eq!(m.len(), 1);
    assert_eq!(m.lock_count_at(t0() + Duration::seconds(2)), 0);
    assert_eq!(m.len(), 0);
    assert_eq!(m.materialized_nodes(), 0);
}

#[test]
fn test_negative_duration_lock_never_expires() {
    let m = manager();
    let timeout = LockTimeout::from_duration(Duration::seconds(-1));
    let token = m
        .create(t0(), LockDetails::new("/neg", timeout, true))
        .unwrap();

    let info = m.get_by_name_at(t0() + Duration::days(30), "/neg").unwrap();
    assert_eq!(info.token, token);
    assert_eq!(info.expiry, None);
    assert_eq!(info.details.duration, LockTimeout::Infinite);
    assert_eq!(m.queued_expiries(), 0);
}

// ============================================================================
// GetByName
// ============================================================================

#[test]
fn test_get_by_name_inherits_infinite_ancestor() {
    let m = manager();
    let token = m
        .create(t0(), infinite("/a").with_owner("<D:href>alice</D:href>"))
        .unwrap();

    let info = m.get_by_name_at(t0(), "/a/b/c").unwrap();
    assert_eq!(info.token, token);
    assert_eq!(info.details.root, "/a");
    assert_eq!(info.details.owner_xml, "<D:href>alice</D:href>");
    assert_eq!(info.expiry, None);
}

#[test]
fn test_get_by_name_ignores_zero_depth_ancestor() {
    let m = manager();
    m.create(t0(), zero("/a")).unwrap();

    assert_eq!(
        m.get_by_name_at(t0(), "/a/b/c"),
        Err(DavLockError::NoSuchLock)
    );
    assert!(m.get_by_name_at(t0(), "/a").is_ok());
}

#[test]
fn test_get_by_name_prefers_nearest_lock() {
    let m = manager();
    m.create(t0(), zero("/a")).unwrap();
    let inner = m.create(t0(), infinite("/a/b")).unwrap();

    let info = m.get_by_name_at(t0(), "/a/b/c/d").unwrap();
    assert_eq!(info.token, inner);
}

#[test]
fn test_get_by_name_without_locks() {
    let m = manager();
    assert_eq!(m.get_by_name("/anything"), Err(DavLockError::NoSuchLock));
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_missing_is_noop() {
    let m = manager();
    assert_eq!(m.delete(t0(), "/nothing/here"), Ok(()));
}

#[test]
fn test_delete_removes_exact_lock() {
    let m = manager();
    let token = m.create(t0(), infinite("/a/b")).unwrap();

    m.delete(t0(), "/a/b/").unwrap();

    assert_eq!(m.unlock(t0(), &token), Err(DavLockError::NoSuchLock));
    assert_eq!(m.materialized_nodes(), 0);
}

#[test]
fn test_delete_leaves_descendant_locks_alone() {
    let m = manager();
    let child = m.create(t0(), zero("/a/b")).unwrap();

    m.delete(t0(), "/a").unwrap();

    assert_eq!(m.create(t0(), infinite("/a")), Err(DavLockError::Locked));
    assert_eq!(m.get_by_name_at(t0(), "/a/b").unwrap().token, child);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_manager_is_shareable_across_threads() {
    use std::sync::Arc;
    use std::thread;

    let m = Arc::new(manager());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                let root = format!("/shared/{}", i);
                let token = m.create(t0(), zero(&root)).unwrap();
                let claim = m
                    .confirm(t0(), &root, "", &[Condition::token(&token)])
                    .unwrap();
                m.release(claim).unwrap();
                token
            })
        })
        .collect();

    let mut tokens: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    tokens.sort();
    tokens.dedup();
    assert_eq!(tokens.len(), 8);
    assert_eq!(m.create(t0(), infinite("/shared")), Err(DavLockError::Locked));
}
