//! The small, fixed block palette used for mesh vertex tagging and mining hardness.

/// A voxel block type. Stored on render-mesh vertices as an `f32` but always holds one of
/// these small non-negative integer values.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum BlockType {
    /// Empty space; never actually meshed, but a valid decode result.
    #[default]
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Snow = 5,
    Gravel = 6,
    Wood = 7,
    Leaves = 8,
}

impl BlockType {
    /// Recovers a block type from its wire/vertex representation, defaulting to [`BlockType::Air`]
    /// for any value outside the known palette rather than panicking on peer-supplied data.
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Air,
            1 => Self::Stone,
            2 => Self::Dirt,
            3 => Self::Grass,
            4 => Self::Sand,
            5 => Self::Snow,
            6 => Self::Gravel,
            7 => Self::Wood,
            8 => Self::Leaves,
            _ => Self::Air,
        }
    }

    /// The wire/vertex representation of this block type.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Seconds it takes to fully mine one block of this type at `speedMult == 1`.
    /// Unknown indices (only reachable through [`from_index`](Self::from_index) fallback) default to `1.0`.
    pub const fn hardness_secs(self) -> f32 {
        match self {
            Self::Air => 0.0,
            Self::Stone => 2.0,
            Self::Dirt => 0.8,
            Self::Grass => 0.8,
            Self::Sand => 0.5,
            Self::Snow => 1.5,
            Self::Gravel => 1.2,
            Self::Wood => 1.5,
            Self::Leaves => 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_index() {
        for i in 0..=8u8 {
            let bt = BlockType::from_index(i);
            assert_eq!(bt.index(), i);
        }
    }

    #[test]
    fn out_of_range_index_defaults_to_air() {
        assert_eq!(BlockType::from_index(200), BlockType::Air);
    }

    #[test]
    fn stone_is_the_hardest_common_block() {
        assert_eq!(BlockType::Stone.hardness_secs(), 2.0);
        assert!(BlockType::Stone.hardness_secs() > BlockType::Dirt.hardness_secs());
    }
}
