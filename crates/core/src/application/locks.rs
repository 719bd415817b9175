// Per-subject advisory locks
//
// Process-local: keeps two handlers from working on the same business at
// the same time. Not a distributed lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Default)]
pub struct SubjectLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `subject`, or None if someone holds it
    pub fn try_acquire(&self, subject: &str) -> Option<SubjectGuard> {
        let mut held = lock_set(&self.held);
        if !held.insert(subject.to_string()) {
            return None;
        }
        Some(SubjectGuard {
            subject: subject.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, subject: &str) -> bool {
        lock_set(&self.held).contains(subject)
    }
}

// The set stays consistent even if a holder panicked mid-operation
fn lock_set(held: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the lock on drop
pub struct SubjectGuard {
    subject: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl SubjectGuard {
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl Drop for SubjectGuard {
    fn drop(&mut self) {
        lock_set(&self.held).remove(&self.subject);
    }
}
