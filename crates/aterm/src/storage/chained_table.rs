#![forbid(unsafe_code)]

use std::collections::TryReserveError;

use log::debug;
use log::warn;
use thiserror::Error;

use crate::storage::BlockStore;
use crate::storage::out_of_memory;

/// A record that can be linked into a bucket chain of a [ChainedTable].
pub(crate) trait Chained {
    /// Returns the next record in the same bucket.
    fn next(&self) -> Option<usize>;

    /// Sets the next record in the same bucket.
    fn set_next(&mut self, next: Option<usize>);
}

/// The reasons why a [ChainedTable] could not grow.
#[derive(Debug, Error)]
pub enum TableGrowError {
    #[error("the table already has the maximum number of {maximum} buckets")]
    Limit { maximum: usize },

    #[error("could not allocate {size} buckets: {source}")]
    Alloc {
        size: usize,
        #[source]
        source: TryReserveError,
    },
}

/// A hash index over the records of a [BlockStore], with separate chaining.
///
/// # Details
///
/// The number of buckets is always a power of two such that the bucket of a
/// hash is obtained by masking. The chains are intrusive, i.e., every record
/// stores the index of the next record in its bucket, and new records are
/// inserted at the head of the chain. Equality is decided by a closure so that
/// records can be looked up with a borrowed key without constructing a record.
pub(crate) struct ChainedTable {
    /// Name used in log messages.
    name: &'static str,

    buckets: Vec<Option<usize>>,

    /// The number of entries at which the next resize is attempted.
    grow_at: usize,

    max_load_percent: usize,

    maximum_size: usize,
}

impl ChainedTable {
    /// Creates a table with the given number of buckets, rounded up to a power of two.
    pub fn new(name: &'static str, size: usize, max_load_percent: usize, maximum_size: usize) -> Self {
        let maximum_size = maximum_size.max(1).checked_next_power_of_two().unwrap_or(1 << (usize::BITS - 1));
        let size = size.max(1).next_power_of_two().min(maximum_size);

        let mut buckets = Vec::new();
        if buckets.try_reserve_exact(size).is_err() {
            out_of_memory::<Option<usize>>(name, size);
        }
        buckets.resize(size, None);

        let mut table = Self {
            name,
            buckets,
            grow_at: 0,
            max_load_percent: max_load_percent.clamp(1, 1000),
            maximum_size,
        };

        table.grow_at = table.load_limit();
        table
    }

    /// Returns the number of buckets.
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the index of the record in the bucket of `hash` for which `equals` holds.
    pub fn find<T: Chained>(&self, store: &BlockStore<T>, hash: u64, mut equals: impl FnMut(&T) -> bool) -> Option<usize> {
        let mut current = self.buckets[self.bucket(hash)];

        while let Some(index) = current {
            let record = store.get(index);
            if equals(record) {
                return Some(index);
            }

            current = record.next();
        }

        None
    }

    /// Returns the number of records in the bucket of `hash` for which `equals` holds.
    pub fn count<T: Chained>(&self, store: &BlockStore<T>, hash: u64, mut equals: impl FnMut(&T) -> bool) -> usize {
        let mut result = 0;
        let mut current = self.buckets[self.bucket(hash)];

        while let Some(index) = current {
            let record = store.get(index);
            if equals(record) {
                result += 1;
            }

            current = record.next();
        }

        result
    }

    /// Links the record at `index` into the head of the bucket for `hash`.
    pub fn insert<T: Chained>(&mut self, store: &mut BlockStore<T>, hash: u64, index: usize) {
        let bucket = self.bucket(hash);
        store.get_mut(index).set_next(self.buckets[bucket]);
        self.buckets[bucket] = Some(index);
    }

    /// Unlinks the record at `index` from the bucket for `hash`.
    pub fn remove<T: Chained>(&mut self, store: &mut BlockStore<T>, hash: u64, index: usize) {
        let bucket = self.bucket(hash);
        let next = store.get(index).next();

        if self.buckets[bucket] == Some(index) {
            self.buckets[bucket] = next;
            return;
        }

        let mut previous = self.buckets[bucket];
        while let Some(current) = previous {
            let following = store.get(current).next();
            if following == Some(index) {
                store.get_mut(current).set_next(next);
                return;
            }

            previous = following;
        }

        panic!("Record {index} is not contained in bucket {bucket} of the {} table", self.name);
    }

    /// Doubles the table when `len` entries reach the maximum load, returns
    /// true iff the table was resized. A failed resize is only reported, the
    /// table keeps working with its current buckets.
    pub fn grow_if_needed<T: Chained>(
        &mut self,
        store: &mut BlockStore<T>,
        len: usize,
        hash_of: impl Fn(&T) -> u64,
    ) -> bool {
        if len < self.grow_at {
            return false;
        }

        match self.try_grow(store, hash_of) {
            Ok(()) => {
                debug!("Resized the {} table to {} buckets for {len} entries", self.name, self.size());
                true
            }
            Err(error) => {
                warn!(
                    "Could not resize the {} table, continuing with {} buckets: {error}",
                    self.name,
                    self.size()
                );

                // Postpone the next attempt until the number of entries has doubled.
                self.grow_at = self.grow_at.saturating_mul(2);
                false
            }
        }
    }

    /// Doubles the number of buckets and relinks all records, leaves the table untouched on failure.
    pub fn try_grow<T: Chained>(
        &mut self,
        store: &mut BlockStore<T>,
        hash_of: impl Fn(&T) -> u64,
    ) -> Result<(), TableGrowError> {
        let size = self.size() * 2;
        if size > self.maximum_size {
            return Err(TableGrowError::Limit {
                maximum: self.maximum_size,
            });
        }

        let mut buckets: Vec<Option<usize>> = Vec::new();
        buckets
            .try_reserve_exact(size)
            .map_err(|source| TableGrowError::Alloc { size, source })?;
        buckets.resize(size, None);

        let mask = size - 1;
        for head in std::mem::take(&mut self.buckets) {
            let mut current = head;
            while let Some(index) = current {
                let record = store.get_mut(index);
                current = record.next();

                let bucket = (hash_of(&*record) as usize) & mask;
                record.set_next(buckets[bucket]);
                buckets[bucket] = Some(index);
            }
        }

        self.buckets = buckets;
        self.grow_at = self.load_limit();
        Ok(())
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Returns the number of entries at which the maximum load is reached.
    fn load_limit(&self) -> usize {
        (self.size().saturating_mul(self.max_load_percent) / 100).max(1)
    }
}
