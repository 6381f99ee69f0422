#![forbid(unsafe_code)]

use std::alloc::Layout;
use std::alloc::handle_alloc_error;
use std::fmt;

use log::error;

/// The largest block that is ever allocated, to bound the memory that is
/// reserved but unused.
pub(crate) const MAXIMUM_BLOCK_SIZE: usize = 1 << 22;

/// A growable store of `T` values that never moves its elements.
///
/// # Details
///
/// Values are stored in a list of blocks, where block `k` has room for
/// `first_block_size << k` slots (until [MAXIMUM_BLOCK_SIZE] is reached). A
/// block is allocated with its full capacity, and is never reallocated, so the
/// flat index returned by [BlockStore::allocate] remains valid until the value
/// is freed. Freed slots are kept in a free list and reused first.
pub(crate) struct BlockStore<T> {
    blocks: Vec<Vec<Slot<T>>>,

    /// The index of the first block that has [MAXIMUM_BLOCK_SIZE] slots, and the flat index at which it starts.
    capped: Option<(usize, usize)>,

    first_block_size: usize,

    /// Head of the free list, threaded through the free slots.
    free: Option<usize>,

    /// The number of occupied slots.
    len: usize,
}

enum Slot<T> {
    Occupied(T),
    Free(Option<usize>),
}

impl<T> BlockStore<T> {
    /// Creates an empty store, the first block is allocated with room for `first_block_size` values.
    pub fn new(first_block_size: usize) -> Self {
        let first_block_size = first_block_size.clamp(1, MAXIMUM_BLOCK_SIZE);

        let mut store = Self {
            blocks: Vec::new(),
            capped: None,
            first_block_size,
            free: None,
            len: 0,
        };

        store.add_block();
        store
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the total number of slots in all blocks.
    pub fn capacity(&self) -> usize {
        (0..self.blocks.len()).map(|block| self.block_size(block)).sum()
    }

    /// Returns the number of blocks.
    #[cfg(test)]
    pub fn number_of_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Stores the value and returns its index.
    pub fn allocate(&mut self, value: T) -> usize {
        self.len += 1;

        if let Some(index) = self.free {
            let (block, offset) = self.position(index);
            let slot = &mut self.blocks[block][offset];

            match slot {
                Slot::Free(next) => self.free = *next,
                Slot::Occupied(_) => panic!("The free list points to occupied slot {index}"),
            }

            *slot = Slot::Occupied(value);
            return index;
        }

        // The reserved capacity can exceed the requested size, the nominal block size is leading.
        let last = self.blocks.len() - 1;
        if self.blocks[last].len() == self.block_size(last) {
            self.add_block();
        }

        let block = self.blocks.len() - 1;
        let start = self.block_start(block);
        let slots = &mut self.blocks[block];

        // Stays within the reserved capacity, so this never moves existing values.
        slots.push(Slot::Occupied(value));
        start + slots.len() - 1
    }

    /// Removes the value at the given index, the slot will be reused by a later allocation.
    pub fn free(&mut self, index: usize) -> T {
        let (block, offset) = self.position(index);
        let slot = std::mem::replace(&mut self.blocks[block][offset], Slot::Free(self.free));

        match slot {
            Slot::Occupied(value) => {
                self.free = Some(index);
                self.len -= 1;
                value
            }
            Slot::Free(_) => panic!("Slot {index} was freed twice"),
        }
    }

    /// Returns a reference to the value at the given index.
    pub fn get(&self, index: usize) -> &T {
        let (block, offset) = self.position(index);
        match &self.blocks[block][offset] {
            Slot::Occupied(value) => value,
            Slot::Free(_) => panic!("Access to freed slot {index}"),
        }
    }

    /// Returns a mutable reference to the value at the given index.
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        let (block, offset) = self.position(index);
        match &mut self.blocks[block][offset] {
            Slot::Occupied(value) => value,
            Slot::Free(_) => panic!("Access to freed slot {index}"),
        }
    }

    /// Returns true iff the slot at the given index holds a value.
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.capacity() {
            return false;
        }

        let (block, offset) = self.position(index);
        matches!(self.blocks[block].get(offset), Some(Slot::Occupied(_)))
    }

    /// Returns an iterator over the occupied slots and their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.blocks.iter().enumerate().flat_map(move |(block, slots)| {
            let start = self.block_start(block);
            slots.iter().enumerate().filter_map(move |(offset, slot)| match slot {
                Slot::Occupied(value) => Some((start + offset, value)),
                Slot::Free(_) => None,
            })
        })
    }

    /// Opens a new block that is twice as large as the previous one.
    fn add_block(&mut self) {
        let block = self.blocks.len();
        let size = self.block_size(block);

        let mut slots = Vec::new();
        if slots.try_reserve_exact(size).is_err() {
            out_of_memory::<Slot<T>>("term store block", size);
        }

        if self.capped.is_none() && size == MAXIMUM_BLOCK_SIZE {
            self.capped = Some((block, self.block_start(block)));
        }

        self.blocks.push(slots);
    }

    /// Returns the number of slots in the given block.
    fn block_size(&self, block: usize) -> usize {
        match self.capped {
            Some((first, _)) if block >= first => MAXIMUM_BLOCK_SIZE,
            _ => self
                .first_block_size
                .checked_shl(block as u32)
                .map_or(MAXIMUM_BLOCK_SIZE, |size| size.min(MAXIMUM_BLOCK_SIZE)),
        }
    }

    /// Returns the flat index of the first slot in the given block.
    fn block_start(&self, block: usize) -> usize {
        match self.capped {
            Some((first, start)) if block >= first => start + (block - first) * MAXIMUM_BLOCK_SIZE,
            _ => self.first_block_size * ((1 << block) - 1),
        }
    }

    /// Decodes a flat index into its block and the offset within that block.
    fn position(&self, index: usize) -> (usize, usize) {
        if let Some((first, start)) = self.capped {
            if index >= start {
                let relative = index - start;
                return (first + relative / MAXIMUM_BLOCK_SIZE, relative % MAXIMUM_BLOCK_SIZE);
            }
        }

        // The blocks before the cap double in size, so block k starts at first_block_size * (2^k - 1).
        let quotient = index / self.first_block_size + 1;
        let block = (usize::BITS - 1 - quotient.leading_zeros()) as usize;
        (block, index - self.block_start(block))
    }
}

impl<T> fmt::Debug for BlockStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockStore {{ len: {}, capacity: {}, blocks: {} }}",
            self.len,
            self.capacity(),
            self.blocks.len()
        )
    }
}

/// Reports that storage for the term library could not be obtained and aborts the process.
pub(crate) fn out_of_memory<T>(what: &str, count: usize) -> ! {
    error!("Out of memory. Cannot allocate {what} with {count} entries.");
    handle_alloc_error(Layout::array::<T>(count).unwrap_or(Layout::new::<T>()))
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use merc_utilities::random_test;

    use super::*;

    #[test]
    fn test_block_store_stable_indices() {
        let mut store = BlockStore::new(4);

        let indices: Vec<usize> = (0..100).map(|value| store.allocate(value)).collect();

        assert_eq!(indices, (0..100).collect::<Vec<_>>());
        assert_eq!(store.number_of_blocks(), 5, "4 + 8 + 16 + 32 + 64 slots are needed for 100 values");
        for (index, value) in indices.iter().enumerate() {
            assert_eq!(*store.get(*value), index);
        }
    }

    #[test]
    fn test_block_store_reuses_free_slots() {
        let mut store = BlockStore::new(4);

        let a = store.allocate("a");
        let b = store.allocate("b");
        assert_eq!(store.free(a), "a");
        assert!(!store.contains(a));

        let c = store.allocate("c");
        assert_eq!(c, a, "The freed slot should be reused");
        assert_eq!(*store.get(b), "b");
        assert_eq!(store.len(), 2);
    }

    #[test]
    #[should_panic(expected = "Access to freed slot")]
    fn test_block_store_freed_access() {
        let mut store = BlockStore::new(2);
        let a = store.allocate(1);
        store.free(a);
        store.get(a);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_block_store() {
        random_test(50, |rng| {
            let mut store = BlockStore::new(rng.random_range(1..16));
            let mut live: Vec<(usize, u64)> = Vec::new();

            for _ in 0..1000 {
                if !live.is_empty() && rng.random_bool(0.4) {
                    let (index, value) = live.swap_remove(rng.random_range(0..live.len()));
                    assert_eq!(store.free(index), value);
                } else {
                    let value = rng.random();
                    live.push((store.allocate(value), value));
                }
            }

            assert_eq!(store.len(), live.len());
            for (index, value) in &live {
                assert_eq!(store.get(*index), value);
            }

            let mut occupied: Vec<usize> = store.iter().map(|(index, _)| index).collect();
            let mut expected: Vec<usize> = live.iter().map(|(index, _)| *index).collect();
            occupied.sort_unstable();
            expected.sort_unstable();
            assert_eq!(occupied, expected);
        });
    }
}
