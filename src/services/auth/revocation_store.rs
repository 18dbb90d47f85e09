use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct SubjectCutoff {
    /// Tokens issued strictly before this instant are treated as revoked.
    cutoff: DateTime<Utc>,
    /// When the longest-lived token issued before the cutoff has expired,
    /// the entry is dead weight and can be swept.
    expires_at: DateTime<Utc>,
}

/// Process-wide registry of invalidated tokens.
///
/// In-memory by default: logout and force-logout guarantees do not survive a
/// process restart. The exposure window after a crash is capped by the token
/// TTLs, since the codec rejects expired tokens on its own. The store is an
/// injected component so a durable implementation can replace it without
/// touching call sites.
///
/// Entries are keyed by `jti` (individual revocation) or subject id (bulk
/// revocation). DashMap shards the locks, so concurrent revoke + check from
/// many requests contend per shard rather than on one global lock, and the
/// sweep never stops the world.
#[derive(Clone, Default)]
pub struct RevocationStore {
    revoked: Arc<DashMap<Uuid, DateTime<Utc>>>,
    subject_cutoffs: Arc<DashMap<Uuid, SubjectCutoff>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a single token invalid until it would have expired anyway.
    pub fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) {
        // Keep the later expiry if the same jti is revoked twice.
        self.revoked
            .entry(jti)
            .and_modify(|existing| {
                if expires_at > *existing {
                    *existing = expires_at;
                }
            })
            .or_insert(expires_at);
    }

    /// Atomically revoke `jti` iff it is not already revoked, holding the
    /// entry lock across the check and the write. Returns whether this call
    /// performed the revocation; `false` means another caller burned the
    /// token first and it must be treated as already revoked.
    ///
    /// A separate `is_revoked` check followed by `revoke` is not a substitute:
    /// two concurrent callers can both pass the check before either writes.
    pub fn revoke_if_active(&self, jti: Uuid, expires_at: DateTime<Utc>) -> bool {
        match self.revoked.entry(jti) {
            Entry::Occupied(mut entry) => {
                let already_active = *entry.get() > Utc::now();
                if expires_at > *entry.get() {
                    entry.insert(expires_at);
                }
                !already_active
            }
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    pub fn is_revoked(&self, jti: &Uuid) -> bool {
        match self.revoked.get(jti) {
            Some(entry) => *entry.value() > Utc::now(),
            None => false,
        }
    }

    /// Bulk revocation: every token for `subject` issued before `cutoff`
    /// becomes invalid (force logout). `expires_at` is the horizon after
    /// which no such token can still be alive.
    pub fn revoke_subject(&self, subject: Uuid, cutoff: DateTime<Utc>, expires_at: DateTime<Utc>) {
        self.subject_cutoffs
            .entry(subject)
            .and_modify(|existing| {
                if cutoff > existing.cutoff {
                    existing.cutoff = cutoff;
                }
                if expires_at > existing.expires_at {
                    existing.expires_at = expires_at;
                }
            })
            .or_insert(SubjectCutoff { cutoff, expires_at });
    }

    pub fn is_subject_revoked(&self, subject: &Uuid, issued_at: DateTime<Utc>) -> bool {
        match self.subject_cutoffs.get(subject) {
            Some(entry) => {
                let entry = *entry.value();
                entry.expires_at > Utc::now() && issued_at < entry.cutoff
            }
            None => false,
        }
    }

    /// Drop entries whose underlying tokens have expired; the codec rejects
    /// those tokens on expiry grounds, so keeping them buys nothing. Returns
    /// the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();

        let expired_jtis: Vec<Uuid> = self
            .revoked
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| *entry.key())
            .collect();
        for jti in &expired_jtis {
            self.revoked.remove(jti);
        }

        let expired_subjects: Vec<Uuid> = self
            .subject_cutoffs
            .iter()
            .filter(|entry| entry.value().expires_at <= now)
            .map(|entry| *entry.key())
            .collect();
        for subject in &expired_subjects {
            self.subject_cutoffs.remove(subject);
        }

        expired_jtis.len() + expired_subjects.len()
    }

    /// Spawn a fixed-interval sweep of expired entries. Growth of the store
    /// is capped to the token validity window.
    pub fn start_cleanup_task(&self, interval_secs: u64) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            info!(
                "Starting revocation store cleanup task (interval: {}s)",
                interval_secs
            );
            loop {
                interval.tick().await;
                let removed = store.cleanup_expired();
                if removed > 0 {
                    info!("Cleaned up {} expired revocation entries", removed);
                }
            }
        });
    }
}
