//! Violation collection
//!
//! The same entity can be visited more than once (an exposure declared in two
//! files, a source split across fragments), but it is reported once.

use dbtgate_core::Violation;
use std::collections::HashSet;

/// Violations deduplicated by subject, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ViolationSet {
    seen: HashSet<String>,
    violations: Vec<Violation>,
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a violation unless its subject was already reported
    pub fn insert(&mut self, violation: Violation) -> bool {
        if !self.seen.insert(violation.subject.clone()) {
            return false;
        }
        self.violations.push(violation);
        true
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.violations
    }
}

impl FromIterator<Violation> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        let mut set = Self::new();
        for violation in iter {
            set.insert(violation);
        }
        set
    }
}

/// Collect violations, keeping the first one per subject
pub fn dedup_by_subject(violations: impl IntoIterator<Item = Violation>) -> Vec<Violation> {
    violations.into_iter().collect::<ViolationSet>().into_vec()
}
