//! Priority queue over node ids, keyed by the Z coordinate of the node.
//!
//! A plain binary max-heap plus a slot table mapping node id to its current
//! heap position, so that an arbitrary queued node can be removed in
//! O(log n) when a merge consumes it.

/// Slot value of a node that is not currently queued.
pub const UNQUEUED: usize = usize::MAX;

#[derive(Default)]
pub struct NodeQueue {
  // (z, id) pairs; higher z pops first, id breaks ties deterministically.
  heap: Vec<(f32, usize)>,
  slot: Vec<usize>,
}

impl NodeQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(n: usize) -> Self {
    Self {
      heap: Vec::with_capacity(n),
      slot: Vec::new(),
    }
  }

  pub fn len(&self) -> usize {
    self.heap.len()
  }

  pub fn is_empty(&self) -> bool {
    self.heap.is_empty()
  }

  /// Current heap position of `id`, or [`UNQUEUED`].
  pub fn queue_index(&self, id: usize) -> usize {
    self.slot.get(id).copied().unwrap_or(UNQUEUED)
  }

  pub fn contains(&self, id: usize) -> bool {
    self.queue_index(id) != UNQUEUED
  }

  pub fn push(&mut self, id: usize, z: f32) {
    debug_assert!(!self.contains(id), "node {id} queued twice");

    if self.slot.len() <= id {
      self.slot.resize(id + 1, UNQUEUED);
    }
    self.heap.push((z, id));
    self.slot[id] = self.heap.len() - 1;
    self.sift_up(self.heap.len() - 1);
  }

  /// Pop the node with the highest Z.
  pub fn pop(&mut self) -> Option<usize> {
    if self.heap.is_empty() {
      return None;
    }
    let (_, id) = self.heap[0];
    self.remove_at(0);
    Some(id)
  }

  /// Remove a node by id. Returns false if it was not queued.
  pub fn remove(&mut self, id: usize) -> bool {
    let idx = self.queue_index(id);
    if idx == UNQUEUED {
      return false;
    }
    self.remove_at(idx);
    true
  }

  fn remove_at(&mut self, idx: usize) {
    let last = self.heap.len() - 1;
    self.slot[self.heap[idx].1] = UNQUEUED;
    if idx != last {
      self.heap.swap(idx, last);
      self.slot[self.heap[idx].1] = idx;
    }
    self.heap.pop();
    if idx < self.heap.len() {
      self.sift_down(idx);
      self.sift_up(idx);
    }
  }

  // (z, id) ordering: larger z wins, smaller id wins ties.
  fn before(a: (f32, usize), b: (f32, usize)) -> bool {
    match a.0.total_cmp(&b.0) {
      std::cmp::Ordering::Greater => true,
      std::cmp::Ordering::Less => false,
      std::cmp::Ordering::Equal => a.1 < b.1,
    }
  }

  fn sift_up(&mut self, mut idx: usize) {
    while idx > 0 {
      let parent = (idx - 1) / 2;
      if !Self::before(self.heap[idx], self.heap[parent]) {
        break;
      }
      self.heap.swap(idx, parent);
      self.slot[self.heap[idx].1] = idx;
      self.slot[self.heap[parent].1] = parent;
      idx = parent;
    }
  }

  fn sift_down(&mut self, mut idx: usize) {
    loop {
      let left = 2 * idx + 1;
      let right = 2 * idx + 2;
      let mut first = idx;
      if left < self.heap.len() && Self::before(self.heap[left], self.heap[first]) {
        first = left;
      }
      if right < self.heap.len() && Self::before(self.heap[right], self.heap[first]) {
        first = right;
      }
      if first == idx {
        break;
      }
      self.heap.swap(idx, first);
      self.slot[self.heap[idx].1] = idx;
      self.slot[self.heap[first].1] = first;
      idx = first;
    }
  }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
