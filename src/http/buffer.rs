use crate::errors::AnalysisError;

/// Append-only accumulator for one response body.
///
/// Owned by exactly one in-flight request. Chunks are appended as they arrive
/// from the network; growth goes through [`Vec::try_reserve`] so an allocation
/// failure surfaces as [`AnalysisError::OutOfMemory`] instead of aborting.
/// An optional ceiling caps the total size the same way.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
    limit: Option<usize>,
}

impl ResponseBuffer {
    /// Creates an empty, unbounded buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer that refuses to grow past `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Pre-allocates room for `additional` bytes, e.g. from `Content-Length`.
    ///
    /// A hint larger than the ceiling is ignored; the ceiling is enforced on
    /// [`append`](Self::append).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::OutOfMemory`] if the allocation fails.
    pub fn reserve_hint(&mut self, additional: usize) -> Result<(), AnalysisError> {
        if self.limit.is_some_and(|limit| additional > limit) {
            return Ok(());
        }
        self.bytes
            .try_reserve(additional)
            .map_err(|_| AnalysisError::OutOfMemory {
                requested: self.bytes.len().saturating_add(additional),
            })
    }

    /// Appends one network chunk.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::OutOfMemory`] if the buffer cannot grow or
    /// the ceiling would be exceeded. The buffer is left unchanged.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), AnalysisError> {
        let requested = self.bytes.len().saturating_add(chunk.len());
        if self.limit.is_some_and(|limit| requested > limit) {
            return Err(AnalysisError::OutOfMemory { requested });
        }
        self.bytes
            .try_reserve(chunk.len())
            .map_err(|_| AnalysisError::OutOfMemory { requested })?;
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Finalizes the buffer, handing the bytes to the reader.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_accumulates_chunks_in_order() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(b"{\"candi").unwrap();
        buffer.append(b"dates\":").unwrap();
        buffer.append(b"[]}").unwrap();

        assert_eq!(buffer.len(), 17);
        assert_eq!(buffer.into_bytes(), b"{\"candidates\":[]}".to_vec());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(b"").unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_limit_rejects_overflowing_chunk() {
        let mut buffer = ResponseBuffer::with_limit(8);
        buffer.append(b"12345").unwrap();

        let err = buffer.append(b"6789").unwrap_err();
        match err {
            AnalysisError::OutOfMemory { requested } => assert_eq!(requested, 9),
            other => panic!("Unexpected error: {other:?}"),
        }
        // Previously received bytes survive the rejected chunk
        assert_eq!(buffer.into_bytes(), b"12345");
    }

    #[test]
    fn test_limit_allows_exact_fill() {
        let mut buffer = ResponseBuffer::with_limit(4);
        buffer.append(b"ab").unwrap();
        buffer.append(b"cd").unwrap();
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_reserve_hint_over_limit_is_ignored() {
        let mut buffer = ResponseBuffer::with_limit(16);
        buffer.reserve_hint(1 << 40).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reserve_hint_impossible_allocation() {
        let mut buffer = ResponseBuffer::new();
        let err = buffer.reserve_hint(usize::MAX).unwrap_err();
        assert!(matches!(err, AnalysisError::OutOfMemory { .. }));
    }
}
