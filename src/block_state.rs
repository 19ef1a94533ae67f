use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const DEFAULT_NAMESPACE: &str = "minecraft";
pub const AIR: &str = "minecraft:air";

/// Value-copied block descriptor: identifier, legacy data value and state
/// properties. The host owns the real block objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    #[serde(default)]
    pub data: u16,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.data != 0 {
            write!(f, ":{}", self.data)?;
        }
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.data.hash(state);
        for (k, v) in &self.properties {
            k.hash(state);
            v.hash(state);
        }
    }
}

/// Prefix `name` with the default namespace when it has none.
pub fn qualify_name(name: &str) -> SmolStr {
    if name.contains(':') {
        SmolStr::new(name)
    } else {
        SmolStr::new(format!("{}:{}", DEFAULT_NAMESPACE, name))
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            data: 0,
            properties: Vec::new(),
        }
    }

    pub fn air() -> Self {
        BlockState::new(AIR)
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR
    }

    pub fn with_data(mut self, data: u16) -> Self {
        self.data = data;
        self
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_properties(mut self, properties: Vec<(SmolStr, SmolStr)>) -> Self {
        self.properties = properties;
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        for (k, v) in &mut self.properties {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.properties.push((key, value));
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        for (k, v) in &self.properties {
            if k == key {
                return Some(v);
            }
        }
        None
    }

    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("Name", self.name.to_string());
        if self.data != 0 {
            compound.insert("val", NbtTag::Short(self.data as i16));
        }

        if !self.properties.is_empty() {
            let mut properties = NbtCompound::new();
            for (key, value) in &self.properties {
                properties.insert(key.to_string(), value.to_string());
            }
            compound.insert("Properties", properties);
        }

        NbtTag::Compound(compound)
    }

    /// Reads both the Java layout (`Name`/`Properties`) and the Bedrock layout
    /// (`name`/`states`/`val`).
    pub fn from_nbt(compound: &NbtCompound) -> Result<Self, String> {
        let name: SmolStr = compound
            .get::<_, &String>("Name")
            .or_else(|_| compound.get::<_, &String>("name"))
            .map_err(|e| format!("Failed to get Name: {}", e))?
            .as_str()
            .into();

        let data = match compound.get::<_, &NbtTag>("val") {
            Ok(NbtTag::Short(v)) => *v as u16,
            Ok(NbtTag::Int(v)) => *v as u16,
            Ok(NbtTag::Byte(v)) => *v as u16,
            _ => 0,
        };

        let mut properties = Vec::new();
        let props = compound
            .get::<_, &NbtCompound>("Properties")
            .or_else(|_| compound.get::<_, &NbtCompound>("states"));
        if let Ok(props) = props {
            for (key, value) in props.inner() {
                let value: SmolStr = match value {
                    NbtTag::String(s) => s.into(),
                    NbtTag::Byte(b) => if *b != 0 { "true" } else { "false" }.into(),
                    NbtTag::Int(i) => i.to_string().into(),
                    _ => continue,
                };
                properties.push((key.into(), value));
            }
            properties.sort();
        }

        Ok(BlockState {
            name: qualify_name(&name),
            data,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_property_overwrites() {
        let mut block = BlockState::new("minecraft:oak_stairs").with_property("facing", "north");
        block.set_property("facing", "east");
        assert_eq!(block.properties.len(), 1);
        assert_eq!(block.get_property("facing").map(|s| s.as_str()), Some("east"));
        assert!(!block.is_air());
        assert!(BlockState::air().is_air());
    }

    #[test]
    fn test_display_includes_data_and_states() {
        let block = BlockState::new("minecraft:wool")
            .with_data(14)
            .with_property("color", "red");
        assert_eq!(block.to_string(), "minecraft:wool:14[color=red]");
    }

    #[test]
    fn test_nbt_roundtrip() {
        let block = BlockState::new("minecraft:oak_log")
            .with_data(2)
            .with_property("axis", "x");
        let NbtTag::Compound(tag) = block.to_nbt() else {
            panic!("expected compound");
        };
        assert_eq!(BlockState::from_nbt(&tag).unwrap(), block);
    }

    #[test]
    fn test_bedrock_layout() {
        let tag = quartz_nbt::snbt::parse(r#"{name:"stone",states:{stone_type:"granite"},val:1s}"#)
            .unwrap();
        let block = BlockState::from_nbt(&tag).unwrap();
        assert_eq!(block.name, "minecraft:stone");
        assert_eq!(block.data, 1);
        assert_eq!(
            block.get_property("stone_type").map(|s| s.as_str()),
            Some("granite")
        );
    }

    #[test]
    fn test_qualify_name() {
        assert_eq!(qualify_name("dirt"), "minecraft:dirt");
        assert_eq!(qualify_name("mod:thing"), "mod:thing");
    }
}
