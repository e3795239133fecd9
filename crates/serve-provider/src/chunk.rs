//! Content chunk source
//!
//! A [`ChunkCursor`] hands out the not-yet-delivered byte ranges of one
//! input, in wire order. Chunks are `bytes::Bytes` handles, so a chunk
//! either aliases the caller-owned wire buffer (zero copy) or, when a
//! contiguous view is forced over fragmented data, an owned copy
//! materialized once and cached for the cursor's lifetime.

use bytes::{Bytes, BytesMut};

/// Cursor over the ordered byte blocks of one input
#[derive(Debug)]
pub struct ChunkCursor {
    blocks: Vec<Bytes>,
    next: usize,
    /// Contiguous copy of the remaining blocks, materialized at most once
    contiguous: Option<Bytes>,
}

impl ChunkCursor {
    pub fn new(blocks: Vec<Bytes>) -> Self {
        Self {
            blocks,
            next: 0,
            contiguous: None,
        }
    }

    /// Bytes not yet delivered
    pub fn remaining(&self) -> usize {
        self.blocks[self.next..].iter().map(Bytes::len).sum()
    }

    /// Return the next undelivered chunk, or `None` once all bytes have
    /// been delivered (idempotently thereafter).
    ///
    /// With `force_contiguous`, the entire remaining input is returned as a
    /// single chunk; when more than one block remains this requires one
    /// copy, which is cached so repeated forced reads never copy twice.
    pub fn next(&mut self, force_contiguous: bool) -> Option<Bytes> {
        if self.next >= self.blocks.len() {
            return None;
        }

        if !force_contiguous || self.next + 1 == self.blocks.len() {
            let block = self.blocks[self.next].clone();
            self.next += 1;
            return Some(block);
        }

        let contiguous = self.contiguous.get_or_insert_with(|| {
            let mut buf = BytesMut::with_capacity(
                self.blocks[self.next..].iter().map(Bytes::len).sum(),
            );
            for block in &self.blocks[self.next..] {
                buf.extend_from_slice(block);
            }
            buf.freeze()
        });

        self.next = self.blocks.len();
        Some(contiguous.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_delivery() {
        let mut cursor = ChunkCursor::new(vec![
            Bytes::from_static(b"12345678"),
            Bytes::from_static(b"abcd"),
        ]);

        assert_eq!(cursor.remaining(), 12);
        assert_eq!(cursor.next(false).unwrap().as_ref(), b"12345678");
        assert_eq!(cursor.remaining(), 4);
        assert_eq!(cursor.next(false).unwrap().as_ref(), b"abcd");
        assert!(cursor.next(false).is_none());
        // End-of-input is idempotent
        assert!(cursor.next(false).is_none());
        assert!(cursor.next(true).is_none());
    }

    #[test]
    fn test_forced_contiguous() {
        let mut cursor = ChunkCursor::new(vec![
            Bytes::from_static(b"12345678"),
            Bytes::from_static(b"abcd"),
        ]);

        assert_eq!(cursor.next(true).unwrap().as_ref(), b"12345678abcd");
        assert!(cursor.next(true).is_none());
    }

    #[test]
    fn test_forced_on_single_block_does_not_copy() {
        let block = Bytes::from_static(b"12345678");
        let mut cursor = ChunkCursor::new(vec![block.clone()]);

        let chunk = cursor.next(true).unwrap();
        assert_eq!(chunk, block);
        // Single remaining block is handed out as-is, no materialized copy
        assert!(cursor.contiguous.is_none());
    }

    #[test]
    fn test_forced_after_partial_delivery() {
        let mut cursor = ChunkCursor::new(vec![
            Bytes::from_static(b"aa"),
            Bytes::from_static(b"bb"),
            Bytes::from_static(b"cc"),
        ]);

        assert_eq!(cursor.next(false).unwrap().as_ref(), b"aa");
        // Forcing now returns only the remaining bytes
        assert_eq!(cursor.next(true).unwrap().as_ref(), b"bbcc");
        assert!(cursor.next(false).is_none());
    }

    #[test]
    fn test_empty_input() {
        let mut cursor = ChunkCursor::new(Vec::new());
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.next(false).is_none());
    }
}
