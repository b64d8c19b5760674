use std::borrow::Borrow;
use std::hash::Hash;

use ahash::{HashMap, HashMapExt};
use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K> {
  key: K,
  weight: u64,
  next: Option<Index>,
  prev: Option<Index>,
}

/// A weight-tracking access-order list.
///
/// The head is the most recently used key and the tail the least recently
/// used. Nodes live in an arena so links are plain indices, and a side map
/// gives O(1) access from a key to its node.
#[derive(Debug)]
pub(crate) struct LruList<K: Eq + Hash + Clone> {
  nodes: Arena<Node<K>>,
  lookup: HashMap<K, Index>,
  head: Option<Index>,
  tail: Option<Index>,
  total_weight: u64,
}

impl<K: Eq + Hash + Clone> LruList<K> {
  pub(crate) fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::new(),
      head: None,
      tail: None,
      total_weight: 0,
    }
  }

  // Splices a node out of the chain, leaving it in the arena with no links.
  fn detach(&mut self, index: Index) {
    let Some(node) = self.nodes.get_mut(index) else {
      return;
    };
    let prev = node.prev.take();
    let next = node.next.take();

    match prev {
      Some(prev) => self.nodes[prev].next = next,
      None => self.head = next,
    }
    match next {
      Some(next) => self.nodes[next].prev = prev,
      None => self.tail = prev,
    }
  }

  // Makes a detached node the head.
  fn attach_head(&mut self, index: Index) {
    match self.head.replace(index) {
      Some(old_head) => {
        self.nodes[old_head].prev = Some(index);
        self.nodes[index].next = Some(old_head);
      }
      None => self.tail = Some(index),
    }
  }

  // Drops a node from the arena and the lookup, releasing its weight.
  fn take(&mut self, index: Index) -> Option<(K, u64)> {
    self.detach(index);
    let node = self.nodes.remove(index)?;
    self.lookup.remove(&node.key);
    self.total_weight -= node.weight;
    Some((node.key, node.weight))
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.lookup.len()
  }

  pub(crate) fn total_weight(&self) -> u64 {
    self.total_weight
  }

  /// Records `key` as the most recently used entry carrying `weight`. A key
  /// already present is moved to the head and reweighed.
  pub(crate) fn push_front(&mut self, key: K, weight: u64) {
    let index = match self.lookup.get(&key) {
      Some(&index) => {
        let node = &mut self.nodes[index];
        self.total_weight -= std::mem::replace(&mut node.weight, weight);
        self.detach(index);
        index
      }
      None => {
        let index = self.nodes.insert(Node {
          key: key.clone(),
          weight,
          next: None,
          prev: None,
        });
        self.lookup.insert(key, index);
        index
      }
    };
    self.total_weight = self.total_weight.saturating_add(weight);
    self.attach_head(index);
  }

  /// Marks `key` as the most recently used entry.
  pub(crate) fn touch<Q>(&mut self, key: &Q)
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let Some(&index) = self.lookup.get(key) else {
      return;
    };
    if self.head != Some(index) {
      self.detach(index);
      self.attach_head(index);
    }
  }

  /// Removes and returns the least recently used key with its weight.
  pub(crate) fn pop_back(&mut self) -> Option<(K, u64)> {
    let tail = self.tail?;
    self.take(tail)
  }

  /// Removes `key`, returning the weight it held.
  pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<u64>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = *self.lookup.get(key)?;
    self.take(index).map(|(_, weight)| weight)
  }

  pub(crate) fn clear(&mut self) {
    self.nodes.clear();
    self.lookup.clear();
    self.head = None;
    self.tail = None;
    self.total_weight = 0;
  }

  // Keys from most to least recently used.
  #[cfg(test)]
  pub(crate) fn keys_as_vec(&self) -> Vec<K> {
    let mut keys = Vec::new();
    let mut current = self.head;
    while let Some(index) = current {
      keys.push(self.nodes[index].key.clone());
      current = self.nodes[index].next;
    }
    keys
  }
}
