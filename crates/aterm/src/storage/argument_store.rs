#![forbid(unsafe_code)]

use crate::storage::MAXIMUM_BLOCK_SIZE;
use crate::storage::TermIndex;
use crate::storage::out_of_memory;

/// Refers to the arguments of one application term inside an [ArgumentStore].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ArgumentSlice {
    block: u32,
    offset: u32,
    length: u32,
}

impl ArgumentSlice {
    /// The arguments of a constant, these occupy no storage.
    pub const EMPTY: ArgumentSlice = ArgumentSlice {
        block: 0,
        offset: 0,
        length: 0,
    };

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns true iff there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Stores the argument lists of application terms as contiguous runs in a
/// list of blocks.
///
/// Freed runs are kept on a free list per length, so that a term of arity `n`
/// reuses the arguments of a deleted term of arity `n`. Blocks are never
/// reallocated, so an [ArgumentSlice] stays valid until it is freed.
pub(crate) struct ArgumentStore {
    blocks: Vec<Vec<TermIndex>>,

    /// The requested size of each block, which can be smaller than its reserved capacity.
    block_sizes: Vec<usize>,

    /// The free runs, indexed by their length.
    free: Vec<Vec<ArgumentSlice>>,

    next_block_size: usize,

    /// The number of arguments in use.
    len: usize,
}

impl ArgumentStore {
    /// Creates an empty store, the first block is allocated on first use.
    pub fn new(first_block_size: usize) -> Self {
        Self {
            blocks: Vec::new(),
            block_sizes: Vec::new(),
            free: Vec::new(),
            next_block_size: first_block_size.clamp(1, MAXIMUM_BLOCK_SIZE),
            len: 0,
        }
    }

    /// Returns the number of arguments in use.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of arguments that can be stored before a new block is needed.
    pub fn capacity(&self) -> usize {
        self.block_sizes.iter().sum()
    }

    /// Copies the arguments into the store.
    pub fn allocate(&mut self, arguments: &[TermIndex]) -> ArgumentSlice {
        let length = arguments.len();
        if length == 0 {
            return ArgumentSlice::EMPTY;
        }

        self.len += length;

        if let Some(slice) = self.free.get_mut(length).and_then(Vec::pop) {
            let offset = slice.offset as usize;
            self.blocks[slice.block as usize][offset..offset + length].copy_from_slice(arguments);
            return slice;
        }

        if self.remaining() < length {
            self.retire_block();
            self.add_block(length);
        }

        let block = self.blocks.len() - 1;
        let slots = &mut self.blocks[block];
        let offset = slots.len();

        // Stays within the reserved capacity, so this never moves existing arguments.
        slots.extend_from_slice(arguments);

        ArgumentSlice {
            block: block as u32,
            offset: offset as u32,
            length: length as u32,
        }
    }

    /// Returns the arguments of the given slice.
    pub fn get(&self, slice: ArgumentSlice) -> &[TermIndex] {
        if slice.is_empty() {
            return &[];
        }

        let offset = slice.offset as usize;
        &self.blocks[slice.block as usize][offset..offset + slice.len()]
    }

    /// Releases the run of arguments, it will be reused for a run of the same length.
    pub fn free(&mut self, slice: ArgumentSlice) {
        if slice.is_empty() {
            return;
        }

        self.len -= slice.len();
        self.push_free(slice);
    }

    /// Returns the number of unused slots at the end of the last block.
    fn remaining(&self) -> usize {
        match (self.blocks.last(), self.block_sizes.last()) {
            (Some(block), Some(size)) => size - block.len(),
            _ => 0,
        }
    }

    /// Hands the unused tail of the last block to the free list of its length.
    fn retire_block(&mut self) {
        let remaining = self.remaining();
        if remaining == 0 {
            return;
        }

        let index = self.blocks.len() - 1;
        let block = &mut self.blocks[index];
        let offset = block.len();
        block.resize(offset + remaining, TermIndex::default());

        self.push_free(ArgumentSlice {
            block: index as u32,
            offset: offset as u32,
            length: remaining as u32,
        });
    }

    /// Opens a new block with room for at least `length` arguments.
    fn add_block(&mut self, length: usize) {
        let size = self.next_block_size.max(length);

        let mut block = Vec::new();
        if block.try_reserve_exact(size).is_err() {
            out_of_memory::<TermIndex>("argument block", size);
        }

        self.blocks.push(block);
        self.block_sizes.push(size);
        self.next_block_size = (size * 2).min(MAXIMUM_BLOCK_SIZE);
    }

    fn push_free(&mut self, slice: ArgumentSlice) {
        let length = slice.len();
        if self.free.len() <= length {
            self.free.resize_with(length + 1, Vec::new);
        }

        self.free[length].push(slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(values: &[usize]) -> Vec<TermIndex> {
        values.iter().map(|value| TermIndex::new(*value)).collect()
    }

    #[test]
    fn test_argument_store_runs() {
        let mut store = ArgumentStore::new(8);

        let a = store.allocate(&indices(&[1, 2]));
        let b = store.allocate(&indices(&[3, 4, 5]));
        let empty = store.allocate(&[]);

        assert_eq!(store.get(a), indices(&[1, 2]).as_slice());
        assert_eq!(store.get(b), indices(&[3, 4, 5]).as_slice());
        assert!(store.get(empty).is_empty());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_argument_store_reuse_by_arity() {
        let mut store = ArgumentStore::new(8);

        let a = store.allocate(&indices(&[1, 2]));
        let _b = store.allocate(&indices(&[3, 4, 5]));
        store.free(a);

        // A run of a different length must not take the freed slot.
        let c = store.allocate(&indices(&[6, 7, 8]));
        assert_ne!(c, a);

        let d = store.allocate(&indices(&[9, 10]));
        assert_eq!(d, a, "A run of the same length should be reused");
        assert_eq!(store.get(d), indices(&[9, 10]).as_slice());
    }

    #[test]
    fn test_argument_store_block_tail_is_reused() {
        let mut store = ArgumentStore::new(4);

        let a = store.allocate(&indices(&[1, 2, 3]));
        // Does not fit in the single remaining slot, so a new block is opened.
        let b = store.allocate(&indices(&[4, 5]));
        assert_ne!(a.block, b.block);

        // The remaining slot of the first block is handed out for a unary term.
        let c = store.allocate(&indices(&[6]));
        assert_eq!(c.block, a.block);
        assert_eq!(store.get(a), indices(&[1, 2, 3]).as_slice());
        assert_eq!(store.get(b), indices(&[4, 5]).as_slice());
        assert_eq!(store.get(c), indices(&[6]).as_slice());
    }

    #[test]
    fn test_argument_store_large_arity() {
        let mut store = ArgumentStore::new(2);

        let values: Vec<usize> = (0..100).collect();
        let a = store.allocate(&indices(&values));
        assert_eq!(store.get(a).len(), 100);
        assert!(store.capacity() >= 100);
    }
}
