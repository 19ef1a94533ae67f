use crate::block_state::BlockState;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use quartz_nbt::io::{Flavor, NbtIoError};
use quartz_nbt::NbtCompound;
use std::io::{Cursor, Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum NbtBlobError {
    #[error("NBT I/O error: {0}")]
    Nbt(#[from] NbtIoError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything stored at one world position: the primary block, the extra
/// ("waterlogged") layer and optional block-entity NBT.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    pub block: BlockState,
    pub extra: Option<BlockState>,
    pub block_entity: Option<NbtCompound>,
}

impl BlockEntry {
    pub fn new(block: BlockState) -> Self {
        BlockEntry {
            block,
            extra: None,
            block_entity: None,
        }
    }

    pub fn air() -> Self {
        BlockEntry::new(BlockState::air())
    }

    pub fn with_extra(mut self, extra: BlockState) -> Self {
        self.extra = if extra.is_air() { None } else { Some(extra) };
        self
    }

    pub fn with_block_entity(mut self, nbt: NbtCompound) -> Self {
        self.block_entity = Some(nbt);
        self
    }

    /// Air in both layers with no block entity.
    pub fn is_air(&self) -> bool {
        self.block.is_air() && self.extra.is_none() && self.block_entity.is_none()
    }
}

impl From<BlockState> for BlockEntry {
    fn from(block: BlockState) -> Self {
        BlockEntry::new(block)
    }
}

/// Binary NBT, zlib compressed.
pub fn compress_nbt(nbt: &NbtCompound) -> Result<Vec<u8>, NbtBlobError> {
    let mut raw = Vec::new();
    quartz_nbt::io::write_nbt(&mut raw, None, nbt, Flavor::Uncompressed)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

pub fn decompress_nbt(data: &[u8]) -> Result<NbtCompound, NbtBlobError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    let (nbt, _) = quartz_nbt::io::read_nbt(&mut Cursor::new(raw), Flavor::Uncompressed)?;
    Ok(nbt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_roundtrip() {
        let nbt = quartz_nbt::snbt::parse(r#"{id:"Chest",Items:[{Count:1b,Name:"stone"}]}"#)
            .unwrap();
        let bytes = compress_nbt(&nbt).unwrap();
        assert_eq!(decompress_nbt(&bytes).unwrap(), nbt);
    }

    #[test]
    fn test_corrupt_blob_is_error() {
        assert!(decompress_nbt(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_air_extra_layer_is_dropped() {
        let e = BlockEntry::new(BlockState::new("minecraft:stone")).with_extra(BlockState::air());
        assert!(e.extra.is_none());
        assert!(BlockEntry::air().is_air());
    }
}
