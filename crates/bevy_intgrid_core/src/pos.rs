//! Integer cell coordinates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A cell coordinate on an unbounded integer grid.
///
/// Ordering is row-major (`y` first, then `x`), which is the order dirty
/// sets and compositor slots are walked in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Mirror across the Y axis (negate `x`)
    pub const fn mirror_x(self) -> Self {
        Self::new(-self.x, self.y)
    }

    /// Mirror across the X axis (negate `y`)
    pub const fn mirror_y(self) -> Self {
        Self::new(self.x, -self.y)
    }

    /// Rotate counter-clockwise by `quadrants` quarter turns
    pub const fn rotate(self, quadrants: u8) -> Self {
        match quadrants % 4 {
            0 => self,
            1 => Self::new(-self.y, self.x),
            2 => Self::new(-self.x, -self.y),
            _ => Self::new(self.y, -self.x),
        }
    }

    /// The four dual-grid cells whose corners include this source cell.
    pub const fn dual_cells(self) -> [GridPos; 4] {
        [
            self,
            Self::new(self.x.wrapping_add(1), self.y),
            Self::new(self.x, self.y.wrapping_add(1)),
            Self::new(self.x.wrapping_add(1), self.y.wrapping_add(1)),
        ]
    }
}

impl Ord for GridPos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for GridPos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for GridPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}

impl Sub for GridPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.wrapping_sub(rhs.x), self.y.wrapping_sub(rhs.y))
    }
}

impl Neg for GridPos {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(self.x.wrapping_neg(), self.y.wrapping_neg())
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rotation_and_mirrors_are_invertible(x in -1000i32..1000, y in -1000i32..1000) {
            let p = GridPos::new(x, y);
            prop_assert_eq!(p.rotate(1).rotate(3), p);
            prop_assert_eq!(p.mirror_x().mirror_x(), p);
            prop_assert_eq!(p.mirror_y().mirror_y(), p);
            prop_assert_eq!(p.rotate(2), -p);
        }
    }
}
