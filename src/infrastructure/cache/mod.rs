//! Bounded outpoint→spend cache with insertion-order eviction.

use std::collections::{HashMap, VecDeque};

use crate::infrastructure::query::TxoSpendInfo;

/// Cache of resolved spends keyed by `"txid:vout"`. Once full, inserting a
/// new key evicts the oldest inserted key. Overwriting an existing key does
/// not change its eviction position.
#[derive(Debug)]
pub struct SpendCache {
    map: HashMap<String, TxoSpendInfo>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SpendCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<&TxoSpendInfo> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn insert(&mut self, key: String, value: TxoSpendInfo) {
        if self.capacity == 0 {
            return;
        }
        if self.map.insert(key.clone(), value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
