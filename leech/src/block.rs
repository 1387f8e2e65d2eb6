use crate::BLOCK_SIZE;

// A block request as it crosses the wire: index, begin, length.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub struct BlockRequest {

    pub piece_idx: u32,

    // Offset in bytes of block within piece.
    pub offset: u32,

    pub len: u32,

}

// Block payload carried by a piece message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {

    pub piece_idx: u32,

    pub offset: u32,

    pub data: Vec<u8>,

}

// Length of a block within a piece; only the final block can come up short.
pub fn block_len(piece_len: u32, block_idx: u32) -> u32 {
    BLOCK_SIZE.min(piece_len - block_idx * BLOCK_SIZE)
}

pub fn num_blocks(piece_len: u32) -> u32 {
    (piece_len + BLOCK_SIZE - 1) / BLOCK_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_len() {
        // Full-sized piece splits into full-sized blocks.
        assert_eq!(block_len(32_768, 0), 16_384);
        assert_eq!(block_len(32_768, 1), 16_384);
        // A 10 KiB tail piece is a single short block.
        assert_eq!(block_len(10_240, 0), 10_240);
        // Tail piece bigger than one block: full block then remainder.
        assert_eq!(block_len(24_930, 0), 16_384);
        assert_eq!(block_len(24_930, 1), 8_546);
    }

    #[test]
    fn test_num_blocks() {
        assert_eq!(num_blocks(16_384), 1);
        assert_eq!(num_blocks(32_768), 2);
        assert_eq!(num_blocks(10_240), 1);
        assert_eq!(num_blocks(16_385), 2);
        assert_eq!(num_blocks(BLOCK_SIZE * 5 + 1000), 6);
    }
}
