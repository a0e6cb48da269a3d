//! Per-mesh bone sets
//!
//! # Layout (v6)
//! ```text
//! per set: i16 offset (4-byte units from this header entry), i16 count
//! per set: i16 bone indices, padded with one i16 when the count is odd
//! ```
//!
//! # Layout (v5)
//! ```text
//! per set: i16[64] bone indices (zero padded), i32 count
//! ```

use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::Result;

use super::MdlVersion;

/// Fixed slot count of a v5 bone set
pub const V5_SLOTS: usize = 64;

/// Model-level bone indices one mesh uses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneSet {
    pub indices: Vec<i16>,
}

pub fn read_bone_sets(
    r: &mut BinaryReader,
    version: MdlVersion,
    count: usize,
) -> Result<Vec<BoneSet>> {
    match version {
        MdlVersion::V6 => {
            let mut counts = Vec::with_capacity(count);
            for _ in 0..count {
                let _offset = r.read_i16()?;
                counts.push(r.read_i16()?.max(0) as usize);
            }
            counts
                .into_iter()
                .map(|n| {
                    let indices = r.read_i16_vec(n)?;
                    if n % 2 == 1 {
                        r.read_i16()?;
                    }
                    Ok(BoneSet { indices })
                })
                .collect()
        }
        MdlVersion::V5 => (0..count)
            .map(|i| {
                let slots = r.read_i16_vec(V5_SLOTS)?;
                let declared = r.read_i32()?.max(0) as usize;
                Ok(BoneSet {
                    indices: slots[..v5_bone_count(i, declared, &slots)].to_vec(),
                })
            })
            .collect(),
    }
}

/// Bones actually held by v5 set `i`, undoing the count shim
///
/// The shim's extra slot is always the zero padding right after the real
/// bones, so a declared count whose last slot holds another bone is taken as is.
fn v5_bone_count(i: usize, declared: usize, slots: &[i16]) -> usize {
    let n = declared.min(V5_SLOTS);
    if i > 0 && n > 0 && declared <= V5_SLOTS && slots[n - 1] == 0 {
        n - 1
    } else {
        n
    }
}

/// Serialize one bone set per mesh
pub fn write_bone_sets(sets: &[BoneSet], version: MdlVersion) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    match version {
        MdlVersion::V6 => {
            for set in sets {
                w.write_i16(0);
                w.write_i16(set.indices.len() as i16);
            }
            for (i, set) in sets.iter().enumerate() {
                let header_pos = i * 4;
                let distance = ((w.len() - header_pos) / 4) as u16;
                w.patch_u16(header_pos, distance);
                for &bone in &set.indices {
                    w.write_i16(bone);
                }
                if set.indices.len() % 2 == 1 {
                    w.write_i16(0);
                }
            }
        }
        MdlVersion::V5 => {
            for (i, set) in sets.iter().enumerate() {
                for slot in 0..V5_SLOTS {
                    w.write_i16(set.indices.get(slot).copied().unwrap_or(0));
                }
                // Engine compatibility: sets after the first that do not fill
                // every slot declare one extra bone
                let n = set.indices.len();
                let declared = if i == 0 || n >= V5_SLOTS { n } else { n + 1 };
                w.write_i32(declared as i32);
            }
        }
    }
    w.into_inner()
}
