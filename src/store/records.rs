//! Chunked record store
//!
//! Fixed-width integer records packed into power-of-two blocks:
//! - Block/slot addressing is a shift and a mask, never a division
//! - Growth appends one block at a time; existing blocks never move
//! - Record 0 is reserved and populated with `write_record`
//! - `append` numbering starts at 1

use crate::error::{DtmError, Result};

/// Record width used by the document store (w0..w3)
pub const RECORD_WIDTH: usize = 4;

/// Word holding the parent link; `special_find` walks it
const PARENT_FIELD: usize = 1;

/// Parent value that terminates an ancestor walk
const NO_PARENT: u32 = u32::MAX;

/// Block-growable array of fixed-width `u32` records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    blocks: Vec<Box<[u32]>>,
    width: usize,
    width_shift: u32,
    low_bits: u32,
    low_mask: usize,
    /// Highest index handed out by `append`
    last_used: u32,
}

impl RecordStore {
    /// Create a store of `width`-int records in blocks of `1 << block_bits` ints.
    ///
    /// `width` must be a power of two that fits in one block, so records never
    /// straddle a block boundary.
    pub fn new(width: usize, block_bits: u32) -> Result<Self> {
        let block = 1usize << block_bits;
        if width == 0 || !width.is_power_of_two() || width > block {
            return Err(DtmError::InvalidRecordWidth { width, block });
        }
        let mut store = Self {
            blocks: Vec::with_capacity(8),
            width,
            width_shift: width.trailing_zeros(),
            low_bits: block_bits,
            low_mask: block - 1,
            last_used: 0,
        };
        // Record 0 always has backing storage
        store.ensure_block(0);
        Ok(store)
    }

    /// Store of four-word records, the layout the document uses.
    pub fn with_block_bits(block_bits: u32) -> Result<Self> {
        Self::new(RECORD_WIDTH, block_bits)
    }

    #[inline]
    fn locate(&self, index: u32) -> (usize, usize) {
        let pos = (index as usize) << self.width_shift;
        (pos >> self.low_bits, pos & self.low_mask)
    }

    fn ensure_block(&mut self, block: usize) {
        while self.blocks.len() <= block {
            self.blocks
                .push(vec![0u32; self.low_mask + 1].into_boxed_slice());
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Highest index handed out so far (record 0 excluded from the count)
    #[inline]
    pub fn slots_used(&self) -> u32 {
        self.last_used
    }

    /// Whether `index` has backing storage that a read may touch
    #[inline]
    pub fn is_allocated(&self, index: u32) -> bool {
        self.locate(index).0 < self.blocks.len()
    }

    /// Number of allocated blocks
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Append one record and return its index.
    ///
    /// # Panics
    /// If `words.len()` differs from the record width.
    pub fn append(&mut self, words: &[u32]) -> u32 {
        assert_eq!(
            words.len(),
            self.width,
            "record of {} words appended to a store of width {}",
            words.len(),
            self.width
        );
        let index = self.last_used + 1;
        let (block, slot) = self.locate(index);
        self.ensure_block(block);
        self.blocks[block][slot..slot + self.width].copy_from_slice(words);
        self.last_used = index;
        index
    }

    /// Borrow the words of one record.
    ///
    /// # Panics
    /// If `index` has no backing block.
    #[inline]
    pub fn read_record(&self, index: u32) -> &[u32] {
        let (block, slot) = self.locate(index);
        &self.blocks[block][slot..slot + self.width]
    }

    /// Read one word of a record.
    ///
    /// # Panics
    /// If `offset` is not below the record width, or `index` has no backing block.
    #[inline]
    pub fn read_field(&self, index: u32, offset: usize) -> u32 {
        assert!(
            offset < self.width,
            "field offset {} out of range for record width {}",
            offset,
            self.width
        );
        let (block, slot) = self.locate(index);
        self.blocks[block][slot + offset]
    }

    /// Overwrite one word in place (back-patching).
    ///
    /// # Panics
    /// Same conditions as [`RecordStore::read_field`].
    #[inline]
    pub fn write_field(&mut self, index: u32, offset: usize, value: u32) {
        assert!(
            offset < self.width,
            "field offset {} out of range for record width {}",
            offset,
            self.width
        );
        let (block, slot) = self.locate(index);
        self.blocks[block][slot + offset] = value;
    }

    /// Overwrite a whole record, allocating blocks up to `index` if needed.
    /// Does not move the append cursor.
    pub fn write_record(&mut self, index: u32, words: &[u32]) {
        assert_eq!(words.len(), self.width);
        let (block, slot) = self.locate(index);
        self.ensure_block(block);
        self.blocks[block][slot..slot + self.width].copy_from_slice(words);
    }

    /// Accept `candidate` unless it is an ancestor of `start`.
    ///
    /// Walks parent links upward from `start`. Returns `None` when the walk
    /// meets `candidate`; otherwise hands `candidate` back. The walk stops at
    /// record 0, so the Document node itself is always accepted.
    pub fn special_find(&self, start: u32, candidate: u32) -> Option<u32> {
        let mut ancestor = start;
        while ancestor != 0 && ancestor != NO_PARENT && self.is_allocated(ancestor) {
            ancestor = self.read_field(ancestor, PARENT_FIELD);
            if ancestor == candidate {
                break;
            }
        }

        if ancestor == 0 || ancestor == NO_PARENT || ancestor != candidate {
            Some(candidate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_append_starts_at_one() {
        let mut store = RecordStore::with_block_bits(10).unwrap();
        assert_eq!(store.slots_used(), 0);
        assert_eq!(store.append(&[1, 2, 3, 4]), 1);
        assert_eq!(store.append(&[5, 6, 7, 8]), 2);
        assert_eq!(store.slots_used(), 2);
        assert_eq!(store.read_record(2), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_record_zero_is_reserved() {
        let mut store = RecordStore::with_block_bits(4).unwrap();
        store.write_record(0, &[9, u32::MAX, u32::MAX, 9]);
        assert_eq!(store.slots_used(), 0);
        assert_eq!(store.read_field(0, 0), 9);
        assert_eq!(store.append(&[1, 0, 0, 0]), 1);
        assert_eq!(store.read_field(0, 3), 9);
    }

    #[test]
    fn test_growth_one_block_at_a_time() {
        // 16 ints per block = 4 records per block
        let mut store = RecordStore::with_block_bits(4).unwrap();
        assert_eq!(store.block_count(), 1);
        for i in 1..=3 {
            store.append(&[i, 0, 0, 0]);
        }
        assert_eq!(store.block_count(), 1);
        store.append(&[4, 0, 0, 0]);
        assert_eq!(store.block_count(), 2);
        assert_eq!(store.read_field(4, 0), 4);
    }

    #[test]
    fn test_write_field_back_patch() {
        let mut store = RecordStore::with_block_bits(10).unwrap();
        let a = store.append(&[1, 0, 0, 7]);
        store.write_field(a, 2, 42);
        assert_eq!(store.read_record(a), &[1, 0, 42, 7]);
    }

    #[test]
    #[should_panic(expected = "field offset")]
    fn test_read_field_offset_out_of_range() {
        let mut store = RecordStore::with_block_bits(10).unwrap();
        store.append(&[1, 2, 3, 4]);
        store.read_field(1, 4);
    }

    #[test]
    fn test_invalid_width() {
        assert!(matches!(
            RecordStore::new(3, 10),
            Err(DtmError::InvalidRecordWidth { width: 3, .. })
        ));
        assert!(RecordStore::new(8, 2).is_err());
        assert!(RecordStore::new(0, 4).is_err());
        assert!(RecordStore::new(2, 4).is_ok());
    }

    #[test]
    fn test_special_find() {
        // 0 <- 1 <- 2 <- 3, and 4 under 1
        let mut store = RecordStore::with_block_bits(10).unwrap();
        store.write_record(0, &[9, NO_PARENT, NO_PARENT, 9]);
        store.append(&[1, 0, 0, 0]);
        store.append(&[1, 1, 0, 0]);
        store.append(&[1, 2, 0, 0]);
        store.append(&[1, 1, 0, 0]);

        // ancestors are rejected
        assert_eq!(store.special_find(3, 2), None);
        assert_eq!(store.special_find(3, 1), None);
        // non-ancestors pass through
        assert_eq!(store.special_find(3, 4), Some(4));
        assert_eq!(store.special_find(4, 2), Some(2));
        // the Document node is always accepted
        assert_eq!(store.special_find(3, 0), Some(0));
    }

    proptest! {
        #[test]
        fn prop_append_read_round_trip(
            records in proptest::collection::vec(any::<[u32; 4]>(), 1..600),
            block_bits in 2u32..8,
        ) {
            let mut store = RecordStore::with_block_bits(block_bits).unwrap();
            for (i, words) in records.iter().enumerate() {
                let index = store.append(words);
                prop_assert_eq!(index as usize, i + 1);
                prop_assert_eq!(store.read_record(index), &words[..]);
            }
            for (i, words) in records.iter().enumerate() {
                prop_assert_eq!(store.read_record(i as u32 + 1), &words[..]);
                prop_assert_eq!(store.read_field(i as u32 + 1, 3), words[3]);
            }
        }
    }
}
