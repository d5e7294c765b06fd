//! Axis-aligned orientations of placed instances.

use serde::{Deserialize, Serialize};

/// A counterclockwise rotation by a multiple of 90 degrees.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Returns the rotation as a number of quarter turns.
    pub fn quarter_turns(&self) -> u8 {
        match self {
            Self::R0 => 0,
            Self::R90 => 1,
            Self::R180 => 2,
            Self::R270 => 3,
        }
    }

    /// Creates a rotation from a number of counterclockwise quarter turns.
    pub fn from_quarter_turns(turns: i64) -> Self {
        match turns.rem_euclid(4) {
            0 => Self::R0,
            1 => Self::R90,
            2 => Self::R180,
            _ => Self::R270,
        }
    }

    /// Returns `(cos, sin)` of the rotation angle.
    pub(crate) fn cos_sin(&self) -> (i64, i64) {
        match self {
            Self::R0 => (1, 0),
            Self::R90 => (0, 1),
            Self::R180 => (-1, 0),
            Self::R270 => (0, -1),
        }
    }
}

/// The orientation of an instance.
///
/// A vertical reflection (about the x-axis) is applied first,
/// followed by the counterclockwise rotation.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orientation {
    pub reflect_vert: bool,
    pub rotation: Rotation,
}

/// Named orientations.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Named {
    #[default]
    Default,
    R90,
    R180,
    R270,
    /// Reflected about the x-axis.
    ReflectVert,
    /// Reflected about the y-axis.
    ReflectHoriz,
    /// Reflected about the line `y = x`.
    FlipYx,
    /// Reflected about the line `y = -x`.
    FlipMinusYx,
}

impl Named {
    /// All eight rectangular orientations.
    pub fn all_rectangular() -> [Named; 8] {
        [
            Self::Default,
            Self::R90,
            Self::R180,
            Self::R270,
            Self::ReflectVert,
            Self::ReflectHoriz,
            Self::FlipYx,
            Self::FlipMinusYx,
        ]
    }

    pub fn into_orientation(self) -> Orientation {
        let (reflect_vert, rotation) = match self {
            Self::Default => (false, Rotation::R0),
            Self::R90 => (false, Rotation::R90),
            Self::R180 => (false, Rotation::R180),
            Self::R270 => (false, Rotation::R270),
            Self::ReflectVert => (true, Rotation::R0),
            Self::ReflectHoriz => (true, Rotation::R180),
            Self::FlipYx => (true, Rotation::R90),
            Self::FlipMinusYx => (true, Rotation::R270),
        };
        Orientation {
            reflect_vert,
            rotation,
        }
    }
}

impl From<Named> for Orientation {
    fn from(value: Named) -> Self {
        value.into_orientation()
    }
}

impl Orientation {
    /// Reflects about the x-axis, composing with the current orientation.
    pub fn reflect_vert(&mut self) {
        self.reflect_vert = !self.reflect_vert;
        self.rotation = Rotation::from_quarter_turns(-(self.rotation.quarter_turns() as i64));
    }

    /// Reflects about the y-axis, composing with the current orientation.
    pub fn reflect_horiz(&mut self) {
        self.reflect_vert();
        self.rotate_90(2);
    }

    /// Rotates counterclockwise by `turns` quarter turns.
    pub fn rotate_90(&mut self, turns: i64) {
        self.rotation =
            Rotation::from_quarter_turns(self.rotation.quarter_turns() as i64 + turns);
    }

    /// Returns the named equivalent of this orientation.
    pub fn named(&self) -> Named {
        match (self.reflect_vert, self.rotation) {
            (false, Rotation::R0) => Named::Default,
            (false, Rotation::R90) => Named::R90,
            (false, Rotation::R180) => Named::R180,
            (false, Rotation::R270) => Named::R270,
            (true, Rotation::R0) => Named::ReflectVert,
            (true, Rotation::R180) => Named::ReflectHoriz,
            (true, Rotation::R90) => Named::FlipYx,
            (true, Rotation::R270) => Named::FlipMinusYx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_round_trips_through_orientation() {
        for named in Named::all_rectangular() {
            assert_eq!(named.into_orientation().named(), named);
        }
    }

    #[test]
    fn double_reflection_is_identity() {
        let mut o = Orientation::from(Named::R90);
        o.reflect_vert();
        o.reflect_vert();
        assert_eq!(o.named(), Named::R90);

        let mut o = Orientation::default();
        o.reflect_horiz();
        assert_eq!(o.named(), Named::ReflectHoriz);
    }
}
