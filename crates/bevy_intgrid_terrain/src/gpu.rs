//! GPU-facing tile records
//!
//! Both types are `#[repr(C)]` and `Pod`, so slices of them upload as-is.
//!
//! | Type | Size | Layout |
//! |---|---|---|
//! | [`TerrainTile`] | 12 bytes | `offset: [f32; 2]`, `flags: u32` |
//! | [`TerrainIndex`] | 8 bytes | `start_index: u32`, `count: u32` |

use bevy_intgrid_rules::SpriteCommand;
use bytemuck::{Pod, Zeroable};

/// Bit 0: parity of the selected result's weight
pub const FLAG_WEIGHT: u32 = 1 << 0;
/// Bit 1: horizontal flip
pub const FLAG_FLIP_X: u32 = 1 << 1;
/// Bit 2: vertical flip
pub const FLAG_FLIP_Y: u32 = 1 << 2;
/// Bits 3-4: counter-clockwise rotation quadrant
pub const FLAG_ROTATION_SHIFT: u32 = 3;
pub const FLAG_ROTATION_MASK: u32 = 0b11 << FLAG_ROTATION_SHIFT;

/// One tile drawn for a composited cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TerrainTile {
    /// Atlas offset of the tile's rectangle
    pub offset: [f32; 2],
    pub flags: u32,
}

impl TerrainTile {
    pub const SIZE: usize = 12;

    pub fn new(offset: [f32; 2], weight: u32, flip_x: bool, flip_y: bool, rotation: u8) -> Self {
        Self {
            offset,
            flags: pack_flags(weight, flip_x, flip_y, rotation),
        }
    }

    pub fn from_sprite(cmd: &SpriteCommand) -> Self {
        Self::new(
            [cmd.sprite.rect[0], cmd.sprite.rect[1]],
            cmd.weight,
            cmd.transform.flip_x,
            cmd.transform.flip_y,
            cmd.transform.rotation,
        )
    }

    pub fn flip_x(&self) -> bool {
        self.flags & FLAG_FLIP_X != 0
    }

    pub fn flip_y(&self) -> bool {
        self.flags & FLAG_FLIP_Y != 0
    }

    pub fn rotation(&self) -> u8 {
        ((self.flags & FLAG_ROTATION_MASK) >> FLAG_ROTATION_SHIFT) as u8
    }
}

/// Range of [`TerrainTile`]s belonging to one composited cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TerrainIndex {
    pub start_index: u32,
    pub count: u32,
}

impl TerrainIndex {
    pub const SIZE: usize = 8;

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_index as usize..(self.start_index + self.count) as usize
    }
}

/// Pack tile flags: weight parity, flips and rotation quadrant.
pub fn pack_flags(weight: u32, flip_x: bool, flip_y: bool, rotation: u8) -> u32 {
    let mut flags = weight & FLAG_WEIGHT;
    if flip_x {
        flags |= FLAG_FLIP_X;
    }
    if flip_y {
        flags |= FLAG_FLIP_Y;
    }
    flags | ((rotation as u32 & 0b11) << FLAG_ROTATION_SHIFT)
}

const _: () = assert!(std::mem::size_of::<TerrainTile>() == TerrainTile::SIZE);
const _: () = assert!(std::mem::size_of::<TerrainIndex>() == TerrainIndex::SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_flags_bit_positions() {
        assert_eq!(pack_flags(1, false, false, 0), 0b00001);
        assert_eq!(pack_flags(2, false, false, 0), 0b00000);
        assert_eq!(pack_flags(0, true, false, 0), 0b00010);
        assert_eq!(pack_flags(0, false, true, 0), 0b00100);
        assert_eq!(pack_flags(0, false, false, 3), 0b11000);
        assert_eq!(pack_flags(3, true, true, 2), 0b10111);
    }

    #[test]
    fn test_flag_accessors() {
        let tile = TerrainTile::new([16.0, 32.0], 4, true, false, 3);
        assert!(tile.flip_x());
        assert!(!tile.flip_y());
        assert_eq!(tile.rotation(), 3);
    }

    #[test]
    fn test_tile_bytes_are_bit_exact() {
        let tile = TerrainTile::new([1.0, 2.0], 1, true, false, 1);
        let bytes = bytemuck::bytes_of(&tile);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &2.0f32.to_ne_bytes());
        assert_eq!(&bytes[8..12], &0b01011u32.to_ne_bytes());
    }

    #[test]
    fn test_index_bytes_are_bit_exact() {
        let index = TerrainIndex {
            start_index: 7,
            count: 2,
        };
        let bytes = bytemuck::bytes_of(&index);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &7u32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_ne_bytes());
        assert_eq!(index.range(), 7..9);
    }
}
