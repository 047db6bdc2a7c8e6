//! Sibling ordering policies.
//!
//! Every directory keeps its child sequences sorted under one of four
//! policies: {alphabetical, last-write-time} × {ascending, descending}.
//! Ties (equal names, equal timestamps) keep insertion order:
//! [`insertion_index`] has upper-bound semantics, so a new entry whose key
//! equals an existing entry's key lands after it. This tie-break is
//! intentional, not incidental.

use super::entry::{EntryArena, EntryId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort policy for the child sequences of a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortPolicy {
    #[default]
    AlphabeticalAsc,
    AlphabeticalDesc,
    LastWriteTimeAsc,
    LastWriteTimeDesc,
}

/// Total order between two sibling entries under `policy`.
pub fn compare(arena: &EntryArena, policy: SortPolicy, a: EntryId, b: EntryId) -> Ordering {
    match policy {
        SortPolicy::AlphabeticalAsc => arena.name(a).cmp(arena.name(b)),
        SortPolicy::AlphabeticalDesc => arena.name(b).cmp(arena.name(a)),
        SortPolicy::LastWriteTimeAsc => arena.last_write_time(a).cmp(&arena.last_write_time(b)),
        SortPolicy::LastWriteTimeDesc => arena.last_write_time(b).cmp(&arena.last_write_time(a)),
    }
}

/// Stable full sort of a child sequence.
pub fn sort_children(arena: &EntryArena, policy: SortPolicy, ids: &mut [EntryId]) {
    ids.sort_by(|&a, &b| compare(arena, policy, a, b));
}

/// Upper-bound insertion point for `new` in an already-sorted sequence.
///
/// O(log n) binary search; the caller performs the O(n) insert.
pub fn insertion_index(
    arena: &EntryArena,
    policy: SortPolicy,
    ids: &[EntryId],
    new: EntryId,
) -> usize {
    ids.partition_point(|&existing| compare(arena, policy, existing, new) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn file(arena: &mut EntryArena, name: &str, mtime_secs: u64) -> EntryId {
        let id = arena.insert_file(Path::new(name), SystemTime::UNIX_EPOCH);
        arena.observe_last_write(id, SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs));
        id
    }

    fn names(arena: &EntryArena, ids: &[EntryId]) -> Vec<String> {
        ids.iter().map(|&id| arena.name(id).to_string()).collect()
    }

    #[test]
    fn alphabetical_orders_both_directions() {
        let mut arena = EntryArena::new();
        let mut ids = vec![
            file(&mut arena, "cherry", 1),
            file(&mut arena, "apple", 2),
            file(&mut arena, "banana", 3),
        ];

        sort_children(&arena, SortPolicy::AlphabeticalAsc, &mut ids);
        assert_eq!(names(&arena, &ids), ["apple", "banana", "cherry"]);

        sort_children(&arena, SortPolicy::AlphabeticalDesc, &mut ids);
        assert_eq!(names(&arena, &ids), ["cherry", "banana", "apple"]);
    }

    #[test]
    fn last_write_time_orders_both_directions() {
        let mut arena = EntryArena::new();
        let mut ids = vec![
            file(&mut arena, "old", 10),
            file(&mut arena, "new", 30),
            file(&mut arena, "mid", 20),
        ];

        sort_children(&arena, SortPolicy::LastWriteTimeAsc, &mut ids);
        assert_eq!(names(&arena, &ids), ["old", "mid", "new"]);

        sort_children(&arena, SortPolicy::LastWriteTimeDesc, &mut ids);
        assert_eq!(names(&arena, &ids), ["new", "mid", "old"]);
    }

    #[test]
    fn insertion_is_upper_bound_on_equal_keys() {
        let mut arena = EntryArena::new();
        let first = file(&mut arena, "same", 5);
        let mut ids = vec![first];

        let second = file(&mut arena, "same", 5);
        let at = insertion_index(&arena, SortPolicy::AlphabeticalAsc, &ids, second);
        assert_eq!(at, 1, "equal key must land after the existing entry");
        ids.insert(at, second);
        assert_eq!(ids, [first, second]);
    }

    #[test]
    fn insertion_into_empty_and_ends() {
        let mut arena = EntryArena::new();
        let b = file(&mut arena, "b", 0);
        assert_eq!(insertion_index(&arena, SortPolicy::AlphabeticalAsc, &[], b), 0);

        let ids = vec![b];
        let a = file(&mut arena, "a", 0);
        let c = file(&mut arena, "c", 0);
        assert_eq!(insertion_index(&arena, SortPolicy::AlphabeticalAsc, &ids, a), 0);
        assert_eq!(insertion_index(&arena, SortPolicy::AlphabeticalAsc, &ids, c), 1);
    }

    proptest! {
        #[test]
        fn incremental_insertion_matches_stable_full_sort(
            entries in proptest::collection::vec(("[a-e]{1,3}", 0u64..16), 0..40),
            policy_pick in 0usize..4,
        ) {
            let policy = [
                SortPolicy::AlphabeticalAsc,
                SortPolicy::AlphabeticalDesc,
                SortPolicy::LastWriteTimeAsc,
                SortPolicy::LastWriteTimeDesc,
            ][policy_pick];

            let mut arena = EntryArena::new();
            let mut ids: Vec<EntryId> = Vec::new();
            for (name, mtime) in &entries {
                let id = file(&mut arena, name, *mtime);
                let at = insertion_index(&arena, policy, &ids, id);
                ids.insert(at, id);
            }

            let mut expected = ids.clone();
            expected.sort_by(|&a, &b| compare(&arena, policy, a, b));
            prop_assert_eq!(&ids, &expected);

            for pair in ids.windows(2) {
                prop_assert_ne!(compare(&arena, policy, pair[0], pair[1]), Ordering::Greater);
            }
        }
    }
}
