//! [`CharView`]: a read-only UTF-16 view of a block.

use std::fmt;

use offmem_block::{BlockView, MemoryBlock, RootBlock};
use offmem_core::bits::CHAR_SIZE_BYTES;
use offmem_core::MemError;

/// Reads a block as a sequence of native-endian UTF-16 code units.
///
/// A trailing odd byte is ignored. Sub-views share the underlying root.
#[derive(Clone, Copy, Debug)]
pub struct CharView<'r> {
    block: BlockView<'r>,
    len: u64,
}

impl<'r> CharView<'r> {
    /// View `block` as characters.
    pub fn new(block: BlockView<'r>) -> Self {
        Self {
            block,
            len: block.size() / CHAR_SIZE_BYTES,
        }
    }

    /// View a whole root as characters.
    pub fn of_root(root: &'r RootBlock) -> Self {
        Self::new(root.as_view())
    }

    /// Number of code units.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the view holds no code units.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_index(&self, index: u64, limit: u64) -> Result<(), MemError> {
        if index >= limit {
            return Err(MemError::out_of_bounds(index, 1, self.len));
        }
        Ok(())
    }

    /// The code unit at `index`.
    pub fn char_at(&self, index: u64) -> Result<u16, MemError> {
        self.check_index(index, self.len)?;
        let mut unit = [0u8; 2];
        self.block.read(index * CHAR_SIZE_BYTES, &mut unit)?;
        Ok(u16::from_ne_bytes(unit))
    }

    /// Code units `start..end`. `end` may equal [`len`](CharView::len).
    pub fn sub_view(&self, start: u64, end: u64) -> Result<CharView<'r>, MemError> {
        self.check_index(end, self.len + 1)?;
        if start > end {
            return Err(MemError::invalid_argument(format!(
                "start index {start} is greater than end index {end}"
            )));
        }
        let root = self.block.root_block();
        let base = self.block.address().wrapping_offset_from(root.address());
        let skip = start * CHAR_SIZE_BYTES;
        // A view that starts before its root (unchecked slicing) has no
        // representable offset into it.
        let offset = base
            .checked_add(skip)
            .ok_or_else(|| MemError::out_of_bounds(base, skip, root.size()))?;
        let slice = root.slice(offset, (end - start) * CHAR_SIZE_BYTES)?;
        Ok(Self::new(slice))
    }

    /// Iterate over the code units.
    pub fn units(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len).map_while(|i| self.char_at(i).ok())
    }
}

impl fmt::Display for CharView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.units()) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offmem_block::presets::{memory_block_factory, test_memory_block_factory};

    fn store(block: &RootBlock, s: &str) {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(u16::to_ne_bytes).collect();
        block.write(0, &bytes).unwrap();
    }

    #[test]
    fn reads_units() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(11).unwrap();
        store(&block, "hello");

        let view = CharView::of_root(&block);
        assert_eq!(view.len(), 5);
        assert_eq!(view.char_at(0), Ok(u16::from(b'h')));
        assert_eq!(view.char_at(4), Ok(u16::from(b'o')));
        assert!(view.char_at(5).is_err());
        assert_eq!(view.to_string(), "hello");

        factory.free(block).unwrap();
    }

    #[test]
    fn sub_views() {
        let factory = test_memory_block_factory();
        let block = factory.allocate(20).unwrap();
        store(&block, "offheap!!!");

        let view = CharView::of_root(&block);
        let heap = view.sub_view(3, 7).unwrap();
        assert_eq!(heap.to_string(), "heap");
        assert_eq!(heap.sub_view(1, 4).unwrap().to_string(), "eap");
        assert_eq!(view.sub_view(7, 10).unwrap().to_string(), "!!!");
        assert!(view.sub_view(0, 11).is_err());
        assert!(matches!(
            view.sub_view(4, 3),
            Err(MemError::InvalidArgument { .. })
        ));
        assert!(view.sub_view(5, 5).unwrap().is_empty());

        factory.free(block).unwrap();
    }

    #[test]
    fn sub_view_of_view_before_its_root_is_rejected() {
        let factory = memory_block_factory();
        let block = factory.allocate(16).unwrap();
        let before_root = block.slice_last(26).unwrap();

        let view = CharView::new(before_root);
        assert_eq!(view.len(), 13);
        assert!(matches!(
            view.sub_view(6, 7),
            Err(MemError::OutOfBounds { .. })
        ));

        factory.free(block).unwrap();
    }
}
