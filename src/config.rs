//! Store configuration
//!
//! Plain struct with defaults and `with_*` builders. All values are checked
//! once by [`DtmConfig::validate`] when a document is created.

use crate::error::{DtmError, Result};
use crate::store::RECORD_WIDTH;

/// Largest block the record store will allocate (2^24 ints)
pub const MAX_BLOCK_BITS: u32 = 24;

/// Largest per-store identity range (2^24 identities)
pub const MAX_IDENTITY_BITS: u8 = 24;

/// Tunables for one document table model instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtmConfig {
    /// log2 of the number of ints per record block
    pub block_bits: u32,
    /// log2 of the identity range covered by one store id (the handle shift K)
    pub identity_bits: u8,
    /// Maintain per-name element lists for typed child/descendant lookups
    pub index_elements: bool,
    /// Drop text runs that are entirely whitespace
    pub strip_whitespace: bool,
}

impl Default for DtmConfig {
    fn default() -> Self {
        Self {
            block_bits: 10,
            identity_bits: 16,
            index_elements: true,
            strip_whitespace: false,
        }
    }
}

impl DtmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block_bits(mut self, bits: u32) -> Self {
        self.block_bits = bits;
        self
    }

    pub fn with_identity_bits(mut self, bits: u8) -> Self {
        self.identity_bits = bits;
        self
    }

    pub fn with_element_index(mut self, enabled: bool) -> Self {
        self.index_elements = enabled;
        self
    }

    pub fn with_whitespace_stripping(mut self, enabled: bool) -> Self {
        self.strip_whitespace = enabled;
        self
    }

    /// Check that the block size holds at least one record and that the
    /// identity shift leaves room for store ids in a 32-bit handle.
    pub fn validate(&self) -> Result<()> {
        let min_block_bits = RECORD_WIDTH.trailing_zeros();
        if self.block_bits < min_block_bits || self.block_bits > MAX_BLOCK_BITS {
            return Err(DtmError::InvalidConfig(format!(
                "block_bits must be in {}..={}, got {}",
                min_block_bits, MAX_BLOCK_BITS, self.block_bits
            )));
        }
        if self.identity_bits == 0 || self.identity_bits > MAX_IDENTITY_BITS {
            return Err(DtmError::InvalidConfig(format!(
                "identity_bits must be in 1..={}, got {}",
                MAX_IDENTITY_BITS, self.identity_bits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DtmConfig::default();
        assert_eq!(config.block_bits, 10);
        assert_eq!(config.identity_bits, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = DtmConfig::new()
            .with_block_bits(4)
            .with_identity_bits(3)
            .with_element_index(false)
            .with_whitespace_stripping(true);
        assert_eq!(config.block_bits, 4);
        assert_eq!(config.identity_bits, 3);
        assert!(!config.index_elements);
        assert!(config.strip_whitespace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_tiny_blocks() {
        // A block of two ints cannot hold a four-word record
        let config = DtmConfig::new().with_block_bits(1);
        assert!(matches!(config.validate(), Err(DtmError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_identity_bits() {
        assert!(DtmConfig::new().with_identity_bits(0).validate().is_err());
        assert!(DtmConfig::new().with_identity_bits(25).validate().is_err());
    }
}
