//! Transformation types and traits.

use serde::{Deserialize, Serialize};

use super::orientation::{Orientation, Rotation};
use super::{Point, Rect};

/// An exact axis-aligned transformation.
///
/// Stored as a 2x2 integer matrix with entries in `{-1, 0, 1}` followed by a translation.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    /// The transformation matrix represented in row-major order.
    pub a: [[i64; 2]; 2],
    /// The x-y translation applied after the matrix.
    pub b: Point,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object unmodified.
    pub fn identity() -> Self {
        Self {
            a: [[1, 0], [0, 1]],
            b: Point::zero(),
        }
    }

    /// Creates a transform that applies `orientation` and then moves the origin to `loc`.
    pub fn with_loc_and_orientation(loc: Point, orientation: impl Into<Orientation>) -> Self {
        let o = orientation.into();
        let (cos, sin) = o.rotation.cos_sin();
        let refl = if o.reflect_vert { -1 } else { 1 };
        // R(theta) * diag(1, refl)
        let a = [[cos, -sin * refl], [sin, cos * refl]];
        Self { a, b: loc }
    }

    /// Returns the inverse transformation.
    pub fn inverse(&self) -> Transformation {
        // Orthogonal matrices are inverted by their transpose.
        let a = [[self.a[0][0], self.a[1][0]], [self.a[0][1], self.a[1][1]]];
        let b = -matvec(&a, self.b);
        Self { a, b }
    }

    /// Recovers the [`Orientation`] encoded by the matrix.
    pub fn orientation(&self) -> Orientation {
        let det = self.a[0][0] * self.a[1][1] - self.a[0][1] * self.a[1][0];
        let rotation = match (self.a[0][0], self.a[1][0]) {
            (1, 0) => Rotation::R0,
            (0, 1) => Rotation::R90,
            (-1, 0) => Rotation::R180,
            _ => Rotation::R270,
        };
        Orientation {
            reflect_vert: det < 0,
            rotation,
        }
    }
}

fn matvec(a: &[[i64; 2]; 2], p: Point) -> Point {
    Point::new(a[0][0] * p.x + a[0][1] * p.y, a[1][0] * p.x + a[1][1] * p.y)
}

/// A trait for specifying how an object is changed by a transformation.
pub trait Transform {
    /// Applies [`Transformation`] `trans`, returning the transformed object.
    fn transform(&self, trans: Transformation) -> Self;
}

impl Transform for Point {
    fn transform(&self, trans: Transformation) -> Self {
        matvec(&trans.a, *self) + trans.b
    }
}

impl Transform for Rect {
    fn transform(&self, trans: Transformation) -> Self {
        Rect::new(self.p0.transform(trans), self.p1.transform(trans))
    }
}

/// A trait for specifying how a shape is translated by a [`Point`].
pub trait Translate {
    /// Translates the shape by a [`Point`] through mutation.
    fn translate(&mut self, p: Point);
}

impl Translate for Point {
    fn translate(&mut self, p: Point) {
        self.x += p.x;
        self.y += p.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Named;

    #[test]
    fn transformation_loc_and_orientation_components() {
        let pt = Point::new(8930, 730);
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(pt, orientation);
            assert_eq!(tf.orientation(), orientation.into());
            assert_eq!(tf.b, pt);
        }
    }

    #[test]
    fn inverse_undoes_transform() {
        let p = Point::new(17, -42);
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(Point::new(380, 340), orientation);
            assert_eq!(p.transform(tf).transform(tf.inverse()), p);
        }
    }

    #[test]
    fn reflections_map_points() {
        let p = Point::new(3, 5);
        let tf = Transformation::with_loc_and_orientation(Point::zero(), Named::ReflectVert);
        assert_eq!(p.transform(tf), Point::new(3, -5));
        let tf = Transformation::with_loc_and_orientation(Point::zero(), Named::ReflectHoriz);
        assert_eq!(p.transform(tf), Point::new(-3, 5));
        let tf = Transformation::with_loc_and_orientation(Point::zero(), Named::R90);
        assert_eq!(p.transform(tf), Point::new(-5, 3));
    }

    #[test]
    fn rect_transform_normalizes_corners() {
        let r = Rect::new(Point::new(0, 0), Point::new(10, 20));
        let tf = Transformation::with_loc_and_orientation(Point::new(100, 0), Named::ReflectHoriz);
        assert_eq!(
            r.transform(tf),
            Rect::new(Point::new(90, 0), Point::new(100, 20))
        );
    }
}
