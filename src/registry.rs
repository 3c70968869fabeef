//! Handle Registry
//!
//! Bookkeeping shared by every document that mints handles in one id space.
//!
//! A handle is `(store_id << K) | local`. Each store id belongs to exactly one
//! document and covers `2^K` of its identities starting at a recorded offset.
//! A document that outgrows one range is given another store id (overflow);
//! its dense identity space is unaffected.
//!
//! The registry is shared as `Rc<RefCell<_>>`: documents are single-threaded
//! and the registry is only touched at creation, overflow and release.

use crate::config::MAX_IDENTITY_BITS;
use crate::error::{DtmError, Result};
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedRegistry = Rc<RefCell<HandleRegistry>>;

/// Opaque owner identity of a registered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey(u64);

/// What one store id maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSlot {
    pub owner: DocumentKey,
    /// First identity covered by this store id
    pub offset: u32,
}

#[derive(Debug)]
pub struct HandleRegistry {
    identity_bits: u8,
    slots: Vec<Option<StoreSlot>>,
    next_key: u64,
}

impl HandleRegistry {
    pub fn new(identity_bits: u8) -> Result<Self> {
        if identity_bits == 0 || identity_bits > MAX_IDENTITY_BITS {
            return Err(DtmError::InvalidConfig(format!(
                "identity_bits must be in 1..={MAX_IDENTITY_BITS}, got {identity_bits}"
            )));
        }
        Ok(Self {
            identity_bits,
            slots: Vec::new(),
            next_key: 1,
        })
    }

    pub fn shared(identity_bits: u8) -> Result<SharedRegistry> {
        Ok(Rc::new(RefCell::new(Self::new(identity_bits)?)))
    }

    /// The handle shift K
    #[inline]
    pub fn identity_bits(&self) -> u8 {
        self.identity_bits
    }

    /// Number of usable store ids. The topmost id is never handed out, so no
    /// handle can collide with the null sentinel.
    pub fn max_store_ids(&self) -> u32 {
        (1u32 << (32 - self.identity_bits as u32)) - 1
    }

    pub fn register_document(&mut self) -> DocumentKey {
        let key = DocumentKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Lowest store id not currently assigned
    pub fn first_free_id(&self) -> Option<u32> {
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len()) as u32;
        (free < self.max_store_ids()).then_some(free)
    }

    /// Assign `store_id` to `owner`, covering identities from `offset`
    pub fn add_store(&mut self, owner: DocumentKey, store_id: u32, offset: u32) -> Result<()> {
        if store_id >= self.max_store_ids() {
            return Err(DtmError::StoreIdsExhausted {
                identity_bits: self.identity_bits,
            });
        }
        let slot = store_id as usize;
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        if let Some(existing) = self.slots[slot] {
            if existing.owner != owner {
                return Err(DtmError::Protocol(format!(
                    "store id {store_id} is already owned by another document"
                )));
            }
        }
        self.slots[slot] = Some(StoreSlot { owner, offset });
        Ok(())
    }

    #[inline]
    pub fn resolve(&self, store_id: u32) -> Option<StoreSlot> {
        self.slots.get(store_id as usize).copied().flatten()
    }

    /// Free every store id owned by `owner`; returns how many were freed
    pub fn release(&mut self, owner: DocumentKey) -> usize {
        let mut freed = 0;
        for slot in self.slots.iter_mut() {
            if matches!(slot, Some(s) if s.owner == owner) {
                *slot = None;
                freed += 1;
            }
        }
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        freed
    }
}
