//! Capacity-checked fuse bitmap

use crate::error::{CoreError, Result};

/// An ordered sequence of fuse bits indexed by fuse address.
///
/// The capacity is fixed at creation time; writes past it are rejected with
/// an error instead of being clipped or wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuseBitmap {
    bits: Vec<bool>,
}

impl FuseBitmap {
    /// Create a bitmap of `capacity` fuses, all cleared.
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![false; capacity],
        }
    }

    /// Number of addressable fuses.
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Set the fuse at `address`.
    pub fn set(&mut self, address: usize, value: bool) -> Result<()> {
        match self.bits.get_mut(address) {
            Some(bit) => {
                *bit = value;
                Ok(())
            }
            None => Err(CoreError::FuseOverflow {
                address,
                capacity: self.bits.len(),
            }),
        }
    }

    /// Read the fuse at `address`; addresses past the end read as 0.
    pub fn get(&self, address: usize) -> bool {
        self.bits.get(address).copied().unwrap_or(false)
    }

    /// Set every fuse to `value` (the JEDEC `F` directive).
    pub fn fill(&mut self, value: bool) {
        self.bits.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let mut map = FuseBitmap::new(16);
        map.set(0, true).unwrap();
        map.set(15, true).unwrap();
        assert!(map.get(0));
        assert!(!map.get(1));
        assert!(map.get(15));
    }

    #[test]
    fn out_of_range_write_is_rejected() {
        let mut map = FuseBitmap::new(8);
        let err = map.set(8, true).unwrap_err();
        assert_eq!(
            err,
            CoreError::FuseOverflow {
                address: 8,
                capacity: 8
            }
        );
    }

    #[test]
    fn fill_overrides_previous_bits() {
        let mut map = FuseBitmap::new(4);
        map.set(2, true).unwrap();
        map.fill(false);
        assert!(!map.get(2));
        map.fill(true);
        assert!(map.get(0) && map.get(3));
    }
}
