//! Session blob: binary NBT holding
//! `{config, mainPos?, vicePos?, regionType?, region?}`.
//! Missing optional fields mean "unset".

use super::Session;
use crate::block_position::{BlockPos, WithDim};
use crate::config::PlayerConfig;
use crate::region::{Region, RegionError, RegionType};
use quartz_nbt::io::{self, Flavor, NbtIoError};
use quartz_nbt::{NbtCompound, NbtTag};
use smol_str::SmolStr;
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("NBT I/O error: {0}")]
    Nbt(#[from] NbtIoError),
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Invalid region: {0}")]
    Region(#[from] RegionError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> StateError {
    StateError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn config_to_nbt(config: &PlayerConfig) -> NbtCompound {
    let mut tag = NbtCompound::new();
    tag.insert("wand", config.wand.to_string());
    tag.insert("defaultRegionType", NbtTag::Int(config.default_region_type.id()));
    tag.insert("minimumResponseTick", NbtTag::Long(config.minimum_response_tick as i64));
    tag.insert("historyLength", NbtTag::Int(config.history_length as i32));
    tag
}

/// Fields absent from `tag` keep their value from `defaults`.
fn config_from_nbt(tag: &NbtCompound, defaults: &PlayerConfig) -> Result<PlayerConfig, StateError> {
    let mut config = defaults.clone();
    match tag.get::<_, &NbtTag>("wand") {
        Ok(NbtTag::String(s)) => config.wand = SmolStr::new(s),
        Ok(_) => return Err(invalid("config.wand", "expected string")),
        Err(_) => {}
    }
    match tag.get::<_, &NbtTag>("defaultRegionType") {
        Ok(NbtTag::Int(id)) => {
            config.default_region_type = RegionType::from_id(*id)
                .ok_or_else(|| invalid("config.defaultRegionType", format!("unknown id {}", id)))?;
        }
        Ok(_) => return Err(invalid("config.defaultRegionType", "expected int")),
        Err(_) => {}
    }
    match tag.get::<_, &NbtTag>("minimumResponseTick") {
        Ok(NbtTag::Long(v)) if *v >= 0 => config.minimum_response_tick = *v as u64,
        Ok(_) => return Err(invalid("config.minimumResponseTick", "expected non-negative long")),
        Err(_) => {}
    }
    match tag.get::<_, &NbtTag>("historyLength") {
        Ok(NbtTag::Int(v)) if *v >= 0 => config.history_length = *v as usize,
        Ok(_) => return Err(invalid("config.historyLength", "expected non-negative int")),
        Err(_) => {}
    }
    Ok(config)
}

impl Session {
    pub fn to_nbt(&self) -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("config", config_to_nbt(&self.config));
        if let Some(pos) = self.main_pos() {
            tag.insert("mainPos", pos.to_nbt());
        }
        if let Some(pos) = self.vice_pos() {
            tag.insert("vicePos", pos.to_nbt());
        }
        if let Some(region_type) = self.region_type {
            tag.insert("regionType", NbtTag::Int(region_type.id()));
        }
        if let Some(region) = &self.region {
            tag.insert("region", region.to_nbt());
        }
        tag
    }

    /// Rebuilds a session. Nothing is drawn until an overlay is attached.
    pub fn from_nbt(tag: &NbtCompound, defaults: &PlayerConfig) -> Result<Session, StateError> {
        let config = match tag.get::<_, &NbtTag>("config") {
            Ok(NbtTag::Compound(c)) => config_from_nbt(c, defaults)?,
            Ok(_) => return Err(invalid("config", "expected compound")),
            Err(_) => defaults.clone(),
        };
        let mut session = Session::new(config);

        let read_pos = |field: &'static str| -> Result<Option<WithDim<BlockPos>>, StateError> {
            match tag.get::<_, &NbtTag>(field) {
                Ok(t) => WithDim::from_nbt(t).map(Some).map_err(|e| invalid(field, e)),
                Err(_) => Ok(None),
            }
        };
        if let Some(pos) = read_pos("mainPos")? {
            session.set_marker(pos, true);
        }
        if let Some(pos) = read_pos("vicePos")? {
            session.set_marker(pos, false);
        }
        match tag.get::<_, &NbtTag>("regionType") {
            Ok(NbtTag::Int(id)) => {
                session.region_type = Some(
                    RegionType::from_id(*id)
                        .ok_or_else(|| invalid("regionType", format!("unknown id {}", id)))?,
                );
            }
            Ok(_) => return Err(invalid("regionType", "expected int")),
            Err(_) => {}
        }
        match tag.get::<_, &NbtTag>("region") {
            Ok(NbtTag::Compound(c)) => session.region = Some(Region::from_nbt(c)?),
            Ok(_) => return Err(invalid("region", "expected compound")),
            Err(_) => {}
        }
        Ok(session)
    }
}

pub fn encode_session(session: &Session) -> Result<Vec<u8>, StateError> {
    let mut buf = Vec::new();
    io::write_nbt(&mut buf, None, &session.to_nbt(), Flavor::Uncompressed)?;
    Ok(buf)
}

pub fn decode_session(data: &[u8], defaults: &PlayerConfig) -> Result<Session, StateError> {
    let (tag, _) = io::read_nbt(&mut Cursor::new(data), Flavor::Uncompressed)?;
    Session::from_nbt(&tag, defaults)
}
