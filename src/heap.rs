//! The candidate game heap.
//!
//! An array-backed binary min-heap of [`CandidateGame`]s with the constraint
//! of at most one game per anchor id, plus an anchor-id → slot map so that
//! `push` can overwrite an anchor's previous game in place and `remove`,
//! `contains`, and `index_of` run without scanning. Every swap updates the
//! array and the map together; the two drifting apart is a bug, not an
//! error condition.

use std::collections::HashMap;

use crate::game::CandidateGame;

#[derive(Debug, Default)]
pub struct CandidateHeap {
    heap: Vec<CandidateGame>,
    index: HashMap<u64, usize>,
}

impl CandidateHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The best game without removing it.
    pub fn peek(&self) -> Option<&CandidateGame> {
        self.heap.first()
    }

    /// Whether a game anchored at `anchor_id` is present.
    pub fn contains(&self, anchor_id: u64) -> bool {
        self.index.contains_key(&anchor_id)
    }

    /// Current array slot of the game anchored at `anchor_id`.
    pub fn index_of(&self, anchor_id: u64) -> Option<usize> {
        self.index.get(&anchor_id).copied()
    }

    /// The heap in array order, for snapshots and diagnostics.
    pub fn as_slice(&self) -> &[CandidateGame] {
        &self.heap
    }

    /// Insert a game, or replace the existing game with the same anchor.
    /// A replacement sifts in whichever single direction the new key calls
    /// for.
    pub fn push(&mut self, game: CandidateGame) {
        let anchor_id = game.anchor_id();
        if let Some(&slot) = self.index.get(&anchor_id) {
            self.heap[slot] = game;
            self.reposition(slot);
        } else {
            self.heap.push(game);
            let slot = self.heap.len() - 1;
            self.index.insert(anchor_id, slot);
            self.sift_up(slot);
        }
    }

    /// Remove the game anchored at `anchor_id`. Removing an absent anchor is
    /// deliberately a no-op: reconciliation passes delete anchors without
    /// checking membership first.
    pub fn remove(&mut self, anchor_id: u64) {
        if let Some(&slot) = self.index.get(&anchor_id) {
            self.remove_at(slot);
        }
    }

    fn remove_at(&mut self, slot: usize) {
        let last = self.heap.len() - 1;
        if slot != last {
            self.swap(slot, last);
        }
        if let Some(removed) = self.heap.pop() {
            self.index.remove(&removed.anchor_id());
        }
        if slot < self.heap.len() {
            self.reposition(slot);
        }
    }

    /// Restore heap order around a slot whose key changed, moving it in the
    /// one direction the comparison with its parent dictates.
    fn reposition(&mut self, slot: usize) {
        if slot == 0 {
            self.sift_down(slot);
            return;
        }
        let parent = (slot - 1) / 2;
        if self.heap[slot].outranks(&self.heap[parent]) {
            self.sift_up(slot);
        } else {
            self.sift_down(slot);
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].outranks(&self.heap[parent]) {
                self.swap(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let mut smallest = slot;
            let left = 2 * slot + 1;
            let right = 2 * slot + 2;

            if left < len && self.heap[left].outranks(&self.heap[smallest]) {
                smallest = left;
            }
            if right < len && self.heap[right].outranks(&self.heap[smallest]) {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.index.insert(self.heap[a].anchor_id(), a);
        self.index.insert(self.heap[b].anchor_id(), b);
    }
}
