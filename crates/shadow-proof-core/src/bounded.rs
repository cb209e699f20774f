use alloc::boxed::Box;

/// A fixed-capacity byte buffer with an explicit active length.
///
/// Bytes past `len` are always zero, so two buffers with equal active content are
/// byte-identical across the whole capacity.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundedBytes<const N: usize> {
    buf: Box<[u8; N]>,
    len: usize,
}

impl<const N: usize> BoundedBytes<N> {
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; N]),
            len: 0,
        }
    }

    /// Copies `bytes` into a fresh buffer; `None` if it exceeds the capacity.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > N {
            return None;
        }
        let mut out = Self::new();
        out.buf[..bytes.len()].copy_from_slice(bytes);
        out.len = bytes.len();
        Some(out)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The whole backing buffer, inactive tail included.
    pub fn as_padded(&self) -> &[u8; N] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for BoundedBytes<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for BoundedBytes<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundedBytes")
            .field("len", &self.len)
            .field("capacity", &N)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_stays_zeroed() {
        let b = BoundedBytes::<8>::from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(b.as_slice(), &[1, 2, 3]);
        assert_eq!(b.as_padded(), &[1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(b.len(), 3);
        assert_eq!(b.capacity(), 8);
    }

    #[test]
    fn rejects_overflow() {
        assert!(BoundedBytes::<2>::from_slice(&[1, 2, 3]).is_none());
        assert!(BoundedBytes::<2>::from_slice(&[]).unwrap().is_empty());
    }
}
