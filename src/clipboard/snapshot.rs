use super::Clipboard;
use crate::block_entry::{compress_nbt, decompress_nbt, BlockEntry, NbtBlobError};
use crate::block_position::BlockPos;
use crate::block_state::BlockState;
use serde::{Deserialize, Serialize};

const MAGIC: &[u8; 4] = b"WECB";
const VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Snapshot data too short")]
    TooShort,
    #[error("Invalid snapshot magic bytes")]
    BadMagic,
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),
    #[error("Snapshot decode error: {0}")]
    Decode(#[from] bincode::Error),
    #[error("Block entity error: {0}")]
    Nbt(#[from] NbtBlobError),
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    block: BlockState,
    extra: Option<BlockState>,
    /// zlib-compressed binary NBT.
    block_entity: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    size: BlockPos,
    player_pos: BlockPos,
    player_rel_pos: BlockPos,
    palette: Vec<SnapshotEntry>,
    cells: Vec<Option<u32>>,
}

pub fn to_snapshot(clipboard: &Clipboard) -> Result<Vec<u8>, ClipboardError> {
    let palette = clipboard
        .palette()
        .iter()
        .map(|entry| {
            Ok(SnapshotEntry {
                block: entry.block.clone(),
                extra: entry.extra.clone(),
                block_entity: entry.block_entity.as_ref().map(compress_nbt).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, ClipboardError>>()?;
    let payload = SnapshotPayload {
        size: clipboard.size(),
        player_pos: clipboard.player_pos(),
        player_rel_pos: clipboard.player_rel_pos(),
        palette,
        cells: clipboard.cells().to_vec(),
    };
    let payload = bincode::serialize(&payload)?;
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn from_snapshot(data: &[u8]) -> Result<Clipboard, ClipboardError> {
    if data.len() < 8 {
        return Err(ClipboardError::TooShort);
    }
    if &data[0..4] != MAGIC {
        return Err(ClipboardError::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return Err(ClipboardError::UnsupportedVersion(version));
    }
    let payload: SnapshotPayload = bincode::deserialize(&data[8..])?;

    let size = payload.size;
    if size.x < 1 || size.y < 1 || size.z < 1 {
        return Err(ClipboardError::Corrupt(format!("invalid size {}", size)));
    }
    let volume = size.x as usize * size.y as usize * size.z as usize;
    if payload.cells.len() != volume {
        return Err(ClipboardError::Corrupt(format!(
            "{} cells for size {}",
            payload.cells.len(),
            size
        )));
    }
    let palette_len = payload.palette.len();
    if let Some(id) = payload.cells.iter().flatten().find(|id| **id as usize >= palette_len) {
        return Err(ClipboardError::Corrupt(format!(
            "palette index {} out of {}",
            id, palette_len
        )));
    }

    let palette = payload
        .palette
        .into_iter()
        .map(|entry| {
            let mut block = BlockEntry::new(entry.block);
            block.extra = entry.extra;
            block.block_entity = entry.block_entity.as_deref().map(decompress_nbt).transpose()?;
            Ok(block)
        })
        .collect::<Result<Vec<_>, ClipboardError>>()?;

    Ok(Clipboard::from_parts(
        size,
        palette,
        payload.cells,
        payload.player_pos,
        payload.player_rel_pos,
    ))
}
