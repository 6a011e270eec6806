//! Host-side instance accumulation.
//!
//! Draw calls append instances here during the frame. Instances sharing a key (a mesh or a
//! primitive) end up contiguous once uploaded, so each key costs a single instanced draw.

use std::collections::HashMap;
use std::hash::Hash;

/// A contiguous range of uploaded instances sharing one key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InstanceBatch<K> {
    pub key: K,
    pub first_instance: u32,
    pub count: u32,
}

/// Instances grouped by key, keys kept in first-insertion order.
#[derive(Clone, Debug)]
pub struct KeyedInstances<K, T> {
    groups: Vec<(K, Vec<T>)>,
    /// Position of every key in `groups`.
    index: HashMap<K, usize>,
    len: usize,
}

impl<K, T> Default for KeyedInstances<K, T> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
            len: 0,
        }
    }
}

impl<K: Copy + Eq + Hash, T: Copy> KeyedInstances<K, T> {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instance under `key`.
    pub fn push(&mut self, key: K, instance: T) {
        match self.index.get(&key) {
            Some(&group) => self.groups[group].1.push(instance),
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push((key, vec![instance]));
            }
        }
        self.len += 1;
    }

    /// Total number of instances.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    /// Batches in upload order, with accumulated instance offsets.
    pub fn batches(&self) -> impl Iterator<Item = InstanceBatch<K>> + '_ {
        let mut first_instance = 0u32;
        self.groups.iter().map(move |(key, instances)| {
            let batch = InstanceBatch {
                key: *key,
                first_instance,
                count: instances.len() as u32,
            };
            first_instance += batch.count;
            batch
        })
    }

    /// Every instance, in batch order.
    pub fn contiguous(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        for (_, instances) in &self.groups {
            out.extend_from_slice(instances);
        }
        out
    }

    /// Removes every instance. Key order restarts from scratch.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.index.clear();
        self.len = 0;
    }
}

/// Instances drawn in submission order.
#[derive(Clone, Debug)]
pub struct FlatInstances<T> {
    instances: Vec<T>,
}

impl<T> Default for FlatInstances<T> {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
        }
    }
}

impl<T: Copy> FlatInstances<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: T) {
        self.instances.push(instance);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.instances
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_accumulate_offsets() {
        let mut instances = KeyedInstances::new();
        instances.push('a', 1);
        instances.push('b', 2);
        instances.push('a', 3);
        instances.push('c', 4);
        instances.push('b', 5);

        let batches: Vec<_> = instances.batches().collect();
        assert_eq!(
            batches,
            vec![
                InstanceBatch {
                    key: 'a',
                    first_instance: 0,
                    count: 2
                },
                InstanceBatch {
                    key: 'b',
                    first_instance: 2,
                    count: 2
                },
                InstanceBatch {
                    key: 'c',
                    first_instance: 4,
                    count: 1
                },
            ]
        );
        assert_eq!(instances.contiguous(), vec![1, 3, 2, 5, 4]);
        assert_eq!(instances.len(), 5);
        assert_eq!(instances.key_count(), 3);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut instances = KeyedInstances::new();
        instances.push(7u32, 1.0f32);
        instances.clear();
        assert!(instances.is_empty());
        assert_eq!(instances.batches().count(), 0);

        let mut flat = FlatInstances::new();
        flat.push(1u8);
        flat.push(2u8);
        assert_eq!(flat.as_slice(), &[1, 2]);
        flat.clear();
        assert!(flat.is_empty());
    }

    #[test]
    fn test_keys_restart_after_clear() {
        let mut instances = KeyedInstances::new();
        instances.push(1u32, 'x');
        instances.push(2u32, 'y');
        instances.clear();

        instances.push(2u32, 'z');
        instances.push(1u32, 'w');
        instances.push(2u32, 'v');
        let keys: Vec<u32> = instances.batches().map(|b| b.key).collect();
        assert_eq!(keys, vec![2, 1]);
        assert_eq!(instances.contiguous(), vec!['z', 'v', 'w']);
    }
}
