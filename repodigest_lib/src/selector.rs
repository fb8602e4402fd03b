//! Bounded top-K selection over scored file records.
//!
//! The selector keeps at most `capacity` records in an array-backed binary
//! min-heap keyed on score, so the weakest held record is always at index 0
//! and can be compared against (and replaced by) a new offer in O(log K).

use std::cmp::Ordering;

use crate::scan::FileRecord;

const PREALLOCATE_LIMIT: usize = 1024;

#[derive(Debug)]
struct Entry {
    record: FileRecord,
    seq: u64,
}

impl Entry {
    /// Heap order: lower score first; among equal scores the later arrival
    /// sits lower so that the earliest-seen record survives eviction.
    fn ranks_below(&self, other: &Entry) -> bool {
        match self.record.score().total_cmp(&other.record.score()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.seq > other.seq,
        }
    }
}

#[derive(Debug)]
pub struct TopKSelector {
    capacity: usize,
    heap: Vec<Entry>,
    next_seq: u64,
}

impl TopKSelector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: Vec::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            next_seq: 0,
        }
    }

    /// A selector that retains every offered record.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Score of the weakest record currently held.
    pub fn min_score(&self) -> Option<f64> {
        self.heap.first().map(|entry| entry.record.score())
    }

    /// Offers a record; returns whether it is now held.
    ///
    /// When full, the record replaces the weakest held one only if its score
    /// is strictly greater, so ties keep the record seen first.
    pub fn offer(&mut self, record: FileRecord) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.capacity == 0 {
            return false;
        }

        if self.heap.len() < self.capacity {
            self.heap.push(Entry { record, seq });
            self.sift_up(self.heap.len() - 1);
            return true;
        }

        let beats_min = self
            .min_score()
            .is_some_and(|min| record.score().total_cmp(&min) == Ordering::Greater);
        if !beats_min {
            return false;
        }

        self.heap[0] = Entry { record, seq };
        self.sift_down(0);
        true
    }

    /// Removes every held record, ordered by descending score (first seen
    /// first among equal scores).
    pub fn drain(&mut self) -> Vec<FileRecord> {
        let mut entries = std::mem::take(&mut self.heap);
        entries.sort_by(|a, b| {
            b.record
                .score()
                .total_cmp(&a.record.score())
                .then(a.seq.cmp(&b.seq))
        });
        entries.into_iter().map(|entry| entry.record).collect()
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.heap[index].ranks_below(&self.heap[parent]) {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut lowest = index;

            if left < len && self.heap[left].ranks_below(&self.heap[lowest]) {
                lowest = left;
            }
            if right < len && self.heap[right].ranks_below(&self.heap[lowest]) {
                lowest = right;
            }
            if lowest == index {
                break;
            }

            self.heap.swap(index, lowest);
            index = lowest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, score: f64) -> FileRecord {
        FileRecord::from_parts(path, "", 0, score)
    }

    fn scores(records: &[FileRecord]) -> Vec<f64> {
        records.iter().map(FileRecord::score).collect()
    }

    #[test]
    fn keeps_two_best_in_descending_order() {
        let mut selector = TopKSelector::new(2);
        for (i, score) in [5.0, 1.0, 9.0, 3.0].into_iter().enumerate() {
            selector.offer(record(&format!("f{i}"), score));
        }
        assert_eq!(scores(&selector.drain()), vec![9.0, 5.0]);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut selector = TopKSelector::new(0);
        assert!(!selector.offer(record("a", 10.0)));
        assert!(selector.is_empty());
        assert!(selector.drain().is_empty());
    }

    #[test]
    fn fewer_than_capacity_returns_all_sorted() {
        let mut selector = TopKSelector::new(10);
        selector.offer(record("a", 2.0));
        selector.offer(record("b", 7.5));
        selector.offer(record("c", -1.0));
        assert_eq!(scores(&selector.drain()), vec![7.5, 2.0, -1.0]);
    }

    #[test]
    fn boundary_tie_keeps_first_seen() {
        let mut selector = TopKSelector::new(2);
        assert!(selector.offer(record("first", 4.0)));
        assert!(selector.offer(record("top", 8.0)));
        assert!(!selector.offer(record("late", 4.0)));

        let paths: Vec<_> = selector
            .drain()
            .into_iter()
            .map(|r| r.path().to_string())
            .collect();
        assert_eq!(paths, vec!["top", "first"]);
    }

    #[test]
    fn eviction_among_equal_minimums_drops_latest() {
        let mut selector = TopKSelector::new(3);
        selector.offer(record("a", 1.0));
        selector.offer(record("b", 1.0));
        selector.offer(record("c", 1.0));
        assert!(selector.offer(record("d", 2.0)));

        let paths: Vec<_> = selector
            .drain()
            .into_iter()
            .map(|r| r.path().to_string())
            .collect();
        assert_eq!(paths, vec!["d", "a", "b"]);
    }

    #[test]
    fn drain_empties_the_selector() {
        let mut selector = TopKSelector::new(3);
        selector.offer(record("a", 1.0));
        assert_eq!(selector.drain().len(), 1);
        assert!(selector.is_empty());
        assert_eq!(selector.min_score(), None);
    }

    #[test]
    fn min_score_tracks_weakest_held() {
        let mut selector = TopKSelector::new(3);
        for score in [4.0, 9.0, 6.0, 7.0, 1.0] {
            selector.offer(record("x", score));
        }
        assert_eq!(selector.len(), 3);
        assert_eq!(selector.min_score(), Some(6.0));
    }

    #[test]
    fn unbounded_keeps_everything() {
        let mut selector = TopKSelector::unbounded();
        for i in 0..500 {
            selector.offer(record("x", f64::from(i)));
        }
        let drained = selector.drain();
        assert_eq!(drained.len(), 500);
        assert_eq!(drained[0].score(), 499.0);
        assert_eq!(drained[499].score(), 0.0);
    }
}
