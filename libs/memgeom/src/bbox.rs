//! Rectangular bounding boxes.

use serde::{Deserialize, Serialize};

use super::{Point, Rect};

/// An axis-aligned rectangular bounding box.
///
/// Unlike a [`Rect`], a [`Bbox`] may be empty, in which case `p0`
/// lies to the upper right of `p1`.
#[derive(Debug, Copy, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bbox {
    pub p0: Point,
    pub p1: Point,
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bbox {
    /// Create a new [`Bbox`] from two [`Point`]s.
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates an empty, otherwise invalid bounding box.
    pub fn empty() -> Self {
        Self {
            p0: Point::new(i64::MAX, i64::MAX),
            p1: Point::new(i64::MIN, i64::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.p0.x > self.p1.x || self.p0.y > self.p1.y
    }

    /// Width of the box, or 0 if it is empty.
    #[inline]
    pub fn width(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.p1.x - self.p0.x
        }
    }

    /// Height of the box, or 0 if it is empty.
    #[inline]
    pub fn height(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.p1.y - self.p0.y
        }
    }

    /// Converts the bounding box into a [`Rect`], or [`None`] if it is empty.
    pub fn into_rect(self) -> Option<Rect> {
        (!self.is_empty()).then(|| Rect::new(self.p0, self.p1))
    }

    /// Returns the smallest box containing both boxes.
    pub fn union(self, other: Bbox) -> Bbox {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        Bbox::new(
            Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        )
    }
}

impl From<Rect> for Bbox {
    fn from(r: Rect) -> Self {
        Self { p0: r.p0, p1: r.p1 }
    }
}

/// Objects with an axis-aligned bounding box.
pub trait BoundBox {
    /// Compute a rectangular bounding box around the implementing type.
    fn bbox(&self) -> Bbox;
}

impl<T> BoundBox for &T
where
    T: BoundBox,
{
    fn bbox(&self) -> Bbox {
        T::bbox(*self)
    }
}

impl BoundBox for Rect {
    fn bbox(&self) -> Bbox {
        Bbox::from(*self)
    }
}

impl<T> BoundBox for [T]
where
    T: BoundBox,
{
    fn bbox(&self) -> Bbox {
        self.iter()
            .fold(Bbox::empty(), |acc, item| acc.union(item.bbox()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_union_is_identity() {
        let r = Rect::new(Point::new(0, 0), Point::new(10, 5));
        assert_eq!(Bbox::empty().union(r.bbox()), r.bbox());
        assert_eq!(r.bbox().union(Bbox::empty()), r.bbox());
        assert!(Bbox::empty().into_rect().is_none());
    }

    #[test]
    fn slice_bbox() {
        let rects = [
            Rect::new(Point::new(0, 0), Point::new(10, 5)),
            Rect::new(Point::new(-5, 20), Point::new(3, 30)),
        ];
        let bbox = rects.bbox();
        assert_eq!(bbox, Bbox::new(Point::new(-5, 0), Point::new(10, 30)));
        assert_eq!(bbox.width(), 15);
        assert_eq!(bbox.height(), 30);
    }
}
