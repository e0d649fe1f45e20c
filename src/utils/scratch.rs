//! Transient scratch buffers for draining CBOR string segments

/// Items at or below this size are staged on the stack
pub const INLINE_CAPACITY: usize = 256;

/// Temporary buffer sized for one item.
///
/// Small items use an inline array; larger items get a heap allocation of
/// exactly the requested size. Either way the storage is released when the
/// value goes out of scope, including on early returns through `?`.
pub enum ScratchBuffer {
    Inline([u8; INLINE_CAPACITY]),
    Heap(Vec<u8>),
}

impl ScratchBuffer {
    /// Acquire a buffer that can hold at least `len` bytes
    #[must_use]
    pub fn with_capacity(len: usize) -> Self {
        if len <= INLINE_CAPACITY {
            Self::Inline([0; INLINE_CAPACITY])
        } else {
            Self::Heap(vec![0; len])
        }
    }

    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// Writable view of the whole buffer
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Inline(bytes) => bytes,
            Self::Heap(bytes) => bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_requests_stay_inline() {
        assert!(ScratchBuffer::with_capacity(0).is_inline());
        assert!(ScratchBuffer::with_capacity(INLINE_CAPACITY).is_inline());
        assert_eq!(
            ScratchBuffer::with_capacity(10).as_mut_slice().len(),
            INLINE_CAPACITY
        );
    }

    #[test]
    fn test_large_requests_use_heap() {
        let mut scratch = ScratchBuffer::with_capacity(INLINE_CAPACITY + 1);
        assert!(!scratch.is_inline());
        assert_eq!(scratch.as_mut_slice().len(), INLINE_CAPACITY + 1);
    }
}
