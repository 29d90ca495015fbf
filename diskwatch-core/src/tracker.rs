//! In-memory record of the file names each folder has already produced.
//!
//! A name enters a folder's set either when the folder is seeded (names that
//! existed before monitoring began, never announced) or after its
//! notification was delivered. Sets only grow; nothing is persisted.

use std::collections::{HashMap, HashSet};

use crate::error::TrackerError;

#[derive(Debug, Default)]
pub struct FolderTracker {
    seen: HashMap<String, HashSet<String>>,
}

impl FolderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a folder with its current names. Returns `false` without touching
    /// anything when the folder is already tracked.
    pub fn initialize<I>(&mut self, folder: &str, names: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        if self.seen.contains_key(folder) {
            return false;
        }
        self.seen
            .insert(folder.to_string(), names.into_iter().collect());
        true
    }

    /// Names in `current` that the folder has not seen yet. Calling this
    /// twice without marking anything returns the same set; order is
    /// unspecified.
    pub fn diff(
        &self,
        folder: &str,
        current: &HashSet<String>,
    ) -> Result<Vec<String>, TrackerError> {
        let seen = self
            .seen
            .get(folder)
            .ok_or_else(|| TrackerError::Untracked(folder.to_string()))?;

        Ok(current.difference(seen).cloned().collect())
    }

    /// Record a delivered notification. Returns whether the name was new.
    pub fn mark_notified(
        &mut self,
        folder: &str,
        name: &str,
    ) -> Result<bool, TrackerError> {
        let seen = self
            .seen
            .get_mut(folder)
            .ok_or_else(|| TrackerError::Untracked(folder.to_string()))?;

        Ok(seen.insert(name.to_string()))
    }

    pub fn is_tracked(&self, folder: &str) -> bool {
        self.seen.contains_key(folder)
    }

    pub fn seen_count(&self, folder: &str) -> Option<usize> {
        self.seen.get(folder).map(HashSet::len)
    }

    pub fn tracked_folders(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn diff_returns_only_unseen_names() {
        let mut tracker = FolderTracker::new();
        assert!(tracker.initialize("/docs", names(&["a.txt", "b.txt"])));

        let current = names(&["a.txt", "b.txt", "c.txt", "d.txt"]);
        let diff = sorted(tracker.diff("/docs", &current).unwrap());
        assert_eq!(diff, vec!["c.txt".to_string(), "d.txt".to_string()]);
    }

    #[test]
    fn diff_is_idempotent_without_marking() {
        let mut tracker = FolderTracker::new();
        tracker.initialize("/docs", names(&["a.txt"]));
        let current = names(&["a.txt", "b.txt", "c.txt"]);

        let first = sorted(tracker.diff("/docs", &current).unwrap());
        let second = sorted(tracker.diff("/docs", &current).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn marking_every_diff_entry_closes_the_gap() {
        let mut tracker = FolderTracker::new();
        tracker.initialize("/docs", names(&["a.txt"]));
        let current = names(&["a.txt", "b.txt", "c.txt"]);

        for name in tracker.diff("/docs", &current).unwrap() {
            assert!(tracker.mark_notified("/docs", &name).unwrap());
        }

        assert!(tracker.diff("/docs", &current).unwrap().is_empty());
        assert_eq!(tracker.seen_count("/docs"), Some(3));
    }

    #[test]
    fn mark_notified_is_idempotent() {
        let mut tracker = FolderTracker::new();
        tracker.initialize("/docs", Vec::new());

        assert!(tracker.mark_notified("/docs", "a.txt").unwrap());
        assert!(!tracker.mark_notified("/docs", "a.txt").unwrap());
        assert_eq!(tracker.seen_count("/docs"), Some(1));
    }

    #[test]
    fn reinitialize_keeps_accumulated_state() {
        let mut tracker = FolderTracker::new();
        tracker.initialize("/docs", names(&["a.txt"]));
        tracker.mark_notified("/docs", "b.txt").unwrap();

        assert!(!tracker.initialize("/docs", Vec::new()));
        assert_eq!(tracker.seen_count("/docs"), Some(2));
    }

    #[test]
    fn untracked_folder_is_a_caller_error() {
        let mut tracker = FolderTracker::new();
        let err = tracker.diff("/missing", &HashSet::new()).unwrap_err();
        assert_eq!(err, TrackerError::Untracked("/missing".to_string()));
        assert!(tracker.mark_notified("/missing", "x").is_err());
        assert!(!tracker.is_tracked("/missing"));
    }

    #[test]
    fn folders_are_independent() {
        let mut tracker = FolderTracker::new();
        tracker.initialize("/a", names(&["same.txt"]));
        tracker.initialize("/b", Vec::new());

        let current = names(&["same.txt"]);
        assert!(tracker.diff("/a", &current).unwrap().is_empty());
        assert_eq!(tracker.diff("/b", &current).unwrap(), vec!["same.txt"]);
        assert_eq!(tracker.tracked_folders(), 2);
    }
}
