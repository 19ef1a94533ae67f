//! Block statistics over a selection: size, count and distribution.

use crate::block_position::BlockPos;
use crate::block_state::{qualify_name, BlockState, DEFAULT_NAMESPACE};
use crate::host::BlockWorld;
use crate::region::Region;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Number of enclosed positions, or only the non-air ones when `all` is false.
pub fn size<W: BlockWorld + Sync + ?Sized>(region: &Region, world: &W, all: bool) -> u64 {
    if all {
        return region.size();
    }
    let dim = region.dim();
    positions(region)
        .par_iter()
        .filter(|pos| !world.get_block(dim, **pos).block.is_air())
        .count() as u64
}

/// Positions whose primary block is `name`, optionally restricted to one
/// legacy data value. Bare names get the default namespace.
pub fn count<W: BlockWorld + Sync + ?Sized>(
    region: &Region,
    world: &W,
    name: &str,
    data: Option<u16>,
) -> u64 {
    let name = qualify_name(name);
    let dim = region.dim();
    positions(region)
        .par_iter()
        .filter(|pos| {
            let block = world.get_block(dim, **pos).block;
            block.name == name && data.map_or(true, |d| d == block.data)
        })
        .count() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Distribution {
    pub total: u64,
    /// Label and count, most frequent first; ties ordered by label.
    pub entries: Vec<(String, u64)>,
}

impl Distribution {
    pub fn percent(&self, count: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

fn label(block: &BlockState, with_states: bool) -> String {
    let name = block
        .name
        .strip_prefix(DEFAULT_NAMESPACE)
        .and_then(|n| n.strip_prefix(':'))
        .unwrap_or(&block.name);
    if !with_states || (block.properties.is_empty() && block.data == 0) {
        return name.to_string();
    }
    let mut states: Vec<String> = Vec::with_capacity(block.properties.len() + 1);
    if block.data != 0 {
        states.push(format!("data={}", block.data));
    }
    states.extend(block.properties.iter().map(|(k, v)| format!("{}={}", k, v)));
    format!("{} [{}]", name, states.join(","))
}

/// Histogram of block kinds. A non-air extra layer is appended as
/// `block & extra`.
pub fn distribution<W: BlockWorld + Sync + ?Sized>(
    region: &Region,
    world: &W,
    with_states: bool,
) -> Distribution {
    let dim = region.dim();
    let positions = positions(region);
    let counts = positions
        .par_iter()
        .fold(FxHashMap::<String, u64>::default, |mut acc, pos| {
            let entry = world.get_block(dim, *pos);
            let mut key = label(&entry.block, with_states);
            if let Some(extra) = &entry.extra {
                key.push_str(" & ");
                key.push_str(&label(extra, with_states));
            }
            *acc.entry(key).or_default() += 1;
            acc
        })
        .reduce(FxHashMap::default, |mut a, b| {
            for (k, v) in b {
                *a.entry(k).or_default() += v;
            }
            a
        });

    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tracing::debug!(total = positions.len(), kinds = entries.len(), "block distribution");
    Distribution {
        total: positions.len() as u64,
        entries,
    }
}

fn positions(region: &Region) -> Vec<BlockPos> {
    region.positions().collect()
}
