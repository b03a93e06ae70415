//! The thread-safe key-value map at the heart of this crate.
//!
//! A [`Store`] is a fixed-width table of [`TABLE_SIZE`] buckets, one per
//! letter `a`-`z`, each independently guarded by its own `Mutex`. A key's
//! bucket is determined once, from the lowercased first byte of the key,
//! and never changes; this is what makes per-bucket locking sound in
//! place of a single table-wide lock — operations on keys that hash to
//! different buckets never contend.

use crate::constants::{MAX_STRING_SIZE, TABLE_SIZE};
use crate::error::{KvsError, KvsErrorKind};
use crate::Result;
use std::io::Write;
use std::sync::Mutex;

/// A collision chain: pairs sharing a hash bucket. Keys within a bucket
/// are unique; newly written pairs are pushed to the front, which is
/// also the order `show`/snapshot traversal observes them in.
#[derive(Debug, Default)]
struct Bucket {
    pairs: Vec<(String, String)>,
}

impl Bucket {
    fn write(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_owned();
        } else {
            self.pairs.insert(0, (key.to_owned(), value.to_owned()));
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn delete(&mut self, key: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.len() != before
    }
}

/// Lowercases `key`'s first byte and maps it to a bucket index.
/// Letters `a`-`z` map to `0..25`; digits `0`-`9` alias the same range
/// as `a`-`j`, matching the original hash function literally (see
/// `SPEC_FULL.md` §9). Any other leading byte, or an empty key, is
/// rejected with `InvalidKey`.
fn hash_key(key: &str) -> Result<usize> {
    let first = key
        .as_bytes()
        .first()
        .ok_or_else(|| KvsErrorKind::InvalidKey(key.to_owned()))?;
    let lower = first.to_ascii_lowercase();
    match lower {
        b'a'..=b'z' => Ok((lower - b'a') as usize),
        b'0'..=b'9' => Ok((lower - b'0') as usize),
        _ => Err(KvsErrorKind::InvalidKey(key.to_owned()).into()),
    }
}

fn check_bounds(key: &str, value: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_STRING_SIZE || value.len() > MAX_STRING_SIZE {
        return Err(KvsErrorKind::InvalidKey(key.to_owned()).into());
    }
    Ok(())
}

/// The in-memory key-value table. Cheap to share: clone the `Arc` that
/// wraps it, never the table itself.
#[derive(Debug)]
pub struct Store {
    buckets: Vec<Mutex<Bucket>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store with `TABLE_SIZE` buckets.
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(TABLE_SIZE);
        for _ in 0..TABLE_SIZE {
            buckets.push(Mutex::new(Bucket::default()));
        }
        Self { buckets }
    }

    /// Upserts `(key, value)`. Replaces the value in place if the key
    /// already exists in its bucket.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        check_bounds(key, value)?;
        let index = hash_key(key)?;
        let mut bucket = self.buckets[index]
            .lock()
            .map_err(|_| KvsError::from(KvsErrorKind::ResourceExhaustion("poisoned lock".into())))?;
        bucket.write(key, value);
        Ok(())
    }

    /// Returns an owned copy of the value stored for `key`, or `None`
    /// if absent.
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        let index = hash_key(key)?;
        let bucket = self.buckets[index]
            .lock()
            .map_err(|_| KvsError::from(KvsErrorKind::ResourceExhaustion("poisoned lock".into())))?;
        Ok(bucket.read(key))
    }

    /// Removes `key` if present. Returns whether it was present.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let index = hash_key(key)?;
        let mut bucket = self.buckets[index]
            .lock()
            .map_err(|_| KvsError::from(KvsErrorKind::ResourceExhaustion("poisoned lock".into())))?;
        Ok(bucket.delete(key))
    }

    /// Writes every pair currently in the store to `sink`, one per
    /// line, as `(key, value)\n`. Each bucket is visited under its own
    /// lock; there is no guarantee of ordering across buckets, and no
    /// single instant at which the whole table is frozen — callers
    /// that need that stronger guarantee should use
    /// [`Store::snapshot_pairs`] instead.
    pub fn show<W: Write>(&self, sink: &mut W) -> Result<()> {
        for bucket in &self.buckets {
            let bucket = bucket
                .lock()
                .map_err(|_| KvsError::from(KvsErrorKind::ResourceExhaustion("poisoned lock".into())))?;
            for (k, v) in &bucket.pairs {
                writeln!(sink, "({}, {})", k, v)?;
            }
        }
        Ok(())
    }

    /// Copies every pair currently in the store into a freshly
    /// allocated vector, locking and releasing one bucket at a time.
    /// Used by the snapshot manager to obtain an owned view it can
    /// hand off to a background writer without holding any bucket lock
    /// across the (potentially slow) file I/O.
    pub fn snapshot_pairs(&self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for bucket in &self.buckets {
            let bucket = bucket
                .lock()
                .map_err(|_| KvsError::from(KvsErrorKind::ResourceExhaustion("poisoned lock".into())))?;
            pairs.extend(bucket.pairs.iter().cloned());
        }
        Ok(pairs)
    }
}
