//! Integer geometry for memory macro layout.
//!
//! All coordinates are in layout database units (nanometers).

use std::fmt::Display;
use std::str::FromStr;

use array_map::{ArrayMap, Indexable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::bbox::Bbox;
use self::transform::Translate;

pub mod bbox;
pub mod orientation;
pub mod transform;

/// Snaps `pos` to the nearest multiple of `grid`.
pub fn snap_to_grid(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);

    let rem = pos.rem_euclid(grid);
    if rem <= grid / 2 {
        pos - rem
    } else {
        pos + grid - rem
    }
}

/// Rounds `pos` up to the next multiple of `grid`.
pub fn snap_up_to_grid(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);

    let rem = pos.rem_euclid(grid);
    if rem == 0 {
        pos
    } else {
        pos + grid - rem
    }
}

/// Integer division of `num` by `den`, rounding toward positive infinity.
///
/// `den` must be positive.
pub fn div_ceil(num: i64, den: i64) -> i64 {
    assert!(den > 0);
    let q = num.div_euclid(den);
    if num.rem_euclid(den) == 0 {
        q
    } else {
        q + 1
    }
}

/// A point in two-dimensional layout space.
#[derive(
    Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// A point whose coordinate along `dir` is `a` and whose other coordinate is `b`.
    pub fn from_dir_coords(dir: Dir, a: i64, b: i64) -> Self {
        match dir {
            Dir::Horiz => Self::new(a, b),
            Dir::Vert => Self::new(b, a),
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn coord(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    #[inline]
    pub fn snap_to_grid(&self, grid: i64) -> Self {
        Self::new(snap_to_grid(self.x, grid), snap_to_grid(self.y, grid))
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(i64, i64)> for Point {
    fn from(value: (i64, i64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

/// A closed interval `[start, stop]` on one axis, with `start <= stop`.
#[derive(
    Debug, Default, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a new [`Span`] between two integers, ordering them if needed.
    pub fn new(start: i64, stop: i64) -> Self {
        Self {
            start: start.min(stop),
            stop: start.max(stop),
        }
    }

    /// Creates a new [`Span`] between two integers.
    ///
    /// The caller must ensure that `start` is less
    /// than or equal to `stop`.
    pub const fn new_unchecked(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    pub fn with_start_and_length(start: i64, length: i64) -> Self {
        Self::new(start, start + length)
    }

    /// Creates a new [`Span`] with center `center` and length `length`.
    ///
    /// Odd lengths place the extra unit above the center.
    pub fn from_center_span(center: i64, length: i64) -> Self {
        assert!(length >= 0);
        let lower = center - length / 2;
        Self::new(lower, lower + length)
    }

    /// Grows the span by `amount` at each end.
    pub fn expand_all(self, amount: i64) -> Self {
        Self::new(self.start - amount, self.stop + amount)
    }

    #[inline]
    pub fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    #[inline]
    pub fn length(&self) -> i64 {
        self.stop - self.start
    }

    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    #[inline]
    pub fn stop(&self) -> i64 {
        self.stop
    }

    /// True if the spans share a region of positive length. Touching spans do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    /// The common part of two spans, possibly of zero length.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);
        (start <= stop).then_some(Self { start, stop })
    }

    /// Sorts `spans` by start, then folds each span into its predecessor while
    /// `merge_fn(current, next)` holds.
    pub fn merge_adjacent(
        spans: impl IntoIterator<Item = Self>,
        mut merge_fn: impl FnMut(Span, Span) -> bool,
    ) -> impl Iterator<Item = Span> {
        let mut spans: Vec<Span> = spans.into_iter().collect();
        spans.sort_by_key(|span| (span.start(), span.stop()));

        let mut merged_spans = Vec::new();

        let mut j = 0;
        while j < spans.len() {
            let mut curr_span = spans[j];
            j += 1;
            while j < spans.len() && merge_fn(curr_span, spans[j]) {
                curr_span = curr_span.union(spans[j]);
                j += 1;
            }
            merged_spans.push(curr_span);
        }

        merged_spans.into_iter()
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    pub fn contains(self, other: Self) -> bool {
        self.union(other) == self
    }

    /// Returns true if `pos` lies within the closed span.
    #[inline]
    pub fn contains_point(&self, pos: i64) -> bool {
        self.start <= pos && pos <= self.stop
    }

    pub fn translate(self, amount: i64) -> Self {
        Self {
            start: self.start + amount,
            stop: self.stop + amount,
        }
    }
}

impl From<(i64, i64)> for Span {
    #[inline]
    fn from(tup: (i64, i64)) -> Self {
        Self::new(tup.0, tup.1)
    }
}

impl From<Span> for (i64, i64) {
    #[inline]
    fn from(s: Span) -> Self {
        (s.start(), s.stop())
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// An axis direction.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Dir {
    /// Along x.
    #[default]
    Horiz,
    /// Along y.
    Vert,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("error parsing direction `{original}`; expected horizontal or vertical")]
pub struct DirParseError {
    original: String,
}

impl FromStr for Dir {
    type Err = DirParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowercase = s.to_lowercase();
        match lowercase.trim() {
            "vertical" | "vert" | "v" => Ok(Self::Vert),
            "horizontal" | "horiz" | "h" => Ok(Self::Horiz),
            _ => Err(DirParseError {
                original: s.to_string(),
            }),
        }
    }
}

impl Dir {
    pub fn other(self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }

    pub fn short_form(&self) -> &'static str {
        match *self {
            Self::Horiz => "h",
            Self::Vert => "v",
        }
    }
}

impl Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Horiz => write!(f, "horizontal"),
            Self::Vert => write!(f, "vertical"),
        }
    }
}

impl std::ops::Not for Dir {
    type Output = Self;
    fn not(self) -> Self::Output {
        self.other()
    }
}

/// The direction of travel along an axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Sign {
    Pos,
    Neg,
}

impl Sign {
    #[inline]
    pub fn as_int(&self) -> i64 {
        match self {
            Self::Pos => 1,
            Self::Neg => -1,
        }
    }
}

impl std::ops::Not for Sign {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Self::Pos => Self::Neg,
            Self::Neg => Self::Pos,
        }
    }
}

/// A side of a rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[repr(u8)]
#[derive(Indexable)]
pub enum Side {
    Top,
    Right,
    Bot,
    Left,
}

/// One value per [`Side`], such as per-side enclosures.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct Sides<T> {
    inner: ArrayMap<Side, T, 4>,
}

impl<T> Sides<T>
where
    T: Copy,
{
    /// Creates a [`Sides`] with `along` on both sides bounding `dir`
    /// and `across` on the remaining two sides.
    pub fn with_dir(dir: Dir, along: T, across: T) -> Self {
        match dir {
            Dir::Horiz => Self::new(across, along, across, along),
            Dir::Vert => Self::new(along, across, along, across),
        }
    }
}

impl<T> Sides<T> {
    pub const fn new(top: T, right: T, bot: T, left: T) -> Self {
        // The ordering here must match the variant order of [`Side`].
        Self {
            inner: ArrayMap::new([top, right, bot, left]),
        }
    }
}

impl<T> std::ops::Index<Side> for Sides<T> {
    type Output = T;
    fn index(&self, index: Side) -> &Self::Output {
        self.inner.index(index)
    }
}

impl<T> std::ops::IndexMut<Side> for Sides<T> {
    fn index_mut(&mut self, index: Side) -> &mut Self::Output {
        self.inner.index_mut(index)
    }
}

/// An axis-aligned rectangle.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    /// The lower-left corner.
    pub p0: Point,
    /// The upper-right corner.
    pub p1: Point,
}

impl Rect {
    /// Creates a new rectangle from any two opposite corners.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from its lower-left corner and dimensions.
    pub fn from_ll_and_dims(ll: Point, dims: Dims) -> Self {
        Self::new(ll, Point::new(ll.x + dims.w(), ll.y + dims.h()))
    }

    /// Creates a rectangle of the given dimensions centered at `center`.
    pub fn from_center_and_dims(center: Point, dims: Dims) -> Self {
        Self::from_spans(
            Span::from_center_span(center.x, dims.w()),
            Span::from_center_span(center.y, dims.h()),
        )
    }

    pub fn from_spans(h: Span, v: Span) -> Self {
        Self {
            p0: Point::new(h.start(), v.start()),
            p1: Point::new(h.stop(), v.stop()),
        }
    }

    /// Creates a rectangle spanning `along` in `dir` and `across` in the other direction.
    pub fn from_dir_spans(dir: Dir, along: Span, across: Span) -> Self {
        match dir {
            Dir::Horiz => Self::from_spans(along, across),
            Dir::Vert => Self::from_spans(across, along),
        }
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.p0.y
    }

    #[inline]
    pub fn top(&self) -> i64 {
        self.p1.y
    }

    #[inline]
    pub fn left(&self) -> i64 {
        self.p0.x
    }

    #[inline]
    pub fn right(&self) -> i64 {
        self.p1.x
    }

    #[inline]
    pub fn hspan(&self) -> Span {
        Span::new(self.p0.x, self.p1.x)
    }

    #[inline]
    pub fn vspan(&self) -> Span {
        Span::new(self.p0.y, self.p1.y)
    }

    pub fn span(&self, dir: Dir) -> Span {
        match dir {
            Dir::Horiz => self.hspan(),
            Dir::Vert => self.vspan(),
        }
    }

    /// Replaces the extent along `dir` with `span`.
    pub fn with_span(self, span: Span, dir: Dir) -> Self {
        match dir {
            Dir::Horiz => Self::from_spans(span, self.vspan()),
            Dir::Vert => Self::from_spans(self.hspan(), span),
        }
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.hspan().length()
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.vspan().length()
    }

    #[inline]
    pub fn length(&self, dir: Dir) -> i64 {
        self.span(dir).length()
    }

    /// Expands each side of the rectangle by its own amount.
    pub fn expand_sides(&self, amounts: Sides<i64>) -> Self {
        Self::new(
            Point::new(self.p0.x - amounts[Side::Left], self.p0.y - amounts[Side::Bot]),
            Point::new(self.p1.x + amounts[Side::Right], self.p1.y + amounts[Side::Top]),
        )
    }

    /// Returns true if the two rectangles share a region of positive area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.hspan().overlaps(&other.hspan()) && self.vspan().overlaps(&other.vspan())
    }

    /// Returns true if `p` lies within the closed rectangle.
    pub fn contains(&self, p: Point) -> bool {
        self.hspan().contains_point(p.x) && self.vspan().contains_point(p.y)
    }

    #[inline]
    pub fn snap_to_grid(&self, grid: i64) -> Self {
        Self::new(self.p0.snap_to_grid(grid), self.p1.snap_to_grid(grid))
    }
}

impl From<Bbox> for Rect {
    fn from(value: Bbox) -> Self {
        Rect::new(value.p0, value.p1)
    }
}

impl Translate for Rect {
    fn translate(&mut self, p: Point) {
        self.p0.translate(p);
        self.p1.translate(p);
    }
}

/// Width and height of an axis-aligned object.
#[derive(
    Debug, Default, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Dims {
    w: i64,
    h: i64,
}

impl Dims {
    pub const fn new(w: i64, h: i64) -> Self {
        Self { w, h }
    }

    pub const fn square(value: i64) -> Self {
        Self { w: value, h: value }
    }

    /// Creates a [`Dims`] measuring `along` in `dir` and `across` in the other direction.
    pub fn from_dir(dir: Dir, along: i64, across: i64) -> Self {
        match dir {
            Dir::Horiz => Self::new(along, across),
            Dir::Vert => Self::new(across, along),
        }
    }

    #[inline]
    pub fn w(&self) -> i64 {
        self.w
    }

    #[inline]
    pub fn h(&self) -> i64 {
        self.h
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn snap_rounds_to_nearest_grid_point() {
        assert_eq!(snap_to_grid(12, 5), 10);
        assert_eq!(snap_to_grid(13, 5), 15);
        assert_eq!(snap_to_grid(-12, 5), -10);
        assert_eq!(snap_up_to_grid(11, 5), 15);
        assert_eq!(snap_up_to_grid(10, 5), 10);
        assert_eq!(snap_up_to_grid(-4, 5), 0);
    }

    #[test]
    fn div_ceil_rounds_up() {
        assert_eq!(div_ceil(50, 7), 8);
        assert_eq!(div_ceil(49, 7), 7);
        assert_eq!(div_ceil(0, 7), 0);
        assert_eq!(div_ceil(-3, 7), 0);
    }

    #[test]
    fn span_overlap_excludes_touching() {
        let a = Span::new(0, 10);
        let b = Span::new(10, 20);
        assert!(!a.overlaps(&b));
        assert_eq!(a.intersection(&b), Some(Span::new(10, 10)));
        assert!(a.overlaps(&Span::new(9, 11)));
        assert_eq!(a.intersection(&Span::new(5, 30)), Some(Span::new(5, 10)));
        assert_eq!(a.intersection(&Span::new(11, 30)), None);
    }

    #[test]
    fn merge_adjacent_sorts_first() {
        let spans = vec![Span::new(20, 30), Span::new(0, 10), Span::new(8, 12)];
        let merged: Vec<_> =
            Span::merge_adjacent(spans, |a, b| b.start() <= a.stop()).collect();
        assert_eq!(merged, vec![Span::new(0, 12), Span::new(20, 30)]);
    }

    #[test]
    fn span_from_center() {
        assert_eq!(Span::from_center_span(100, 40), Span::new(80, 120));
        assert_eq!(Span::from_center_span(0, 5), Span::new(-2, 3));
    }

    #[test]
    fn rect_expand_sides() {
        let r = Rect::new(Point::new(0, 0), Point::new(10, 20));
        let e = r.expand_sides(Sides::with_dir(Dir::Vert, 5, 1));
        assert_eq!(e, Rect::new(Point::new(-1, -5), Point::new(11, 25)));
    }

    #[test]
    fn rect_from_center_and_dims() {
        let r = Rect::from_center_and_dims(Point::new(50, 50), Dims::new(20, 10));
        assert_eq!(r, Rect::new(Point::new(40, 45), Point::new(60, 55)));
        assert_eq!(r.center(), Point::new(50, 50));
    }

    #[test]
    fn rect_overlap() {
        let a = Rect::new(Point::new(0, 0), Point::new(10, 10));
        let b = Rect::new(Point::new(10, 0), Point::new(20, 10));
        let c = Rect::new(Point::new(5, 5), Point::new(20, 20));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn dir_parsing() {
        assert_eq!("V".parse::<Dir>().unwrap(), Dir::Vert);
        assert_eq!(" horiz ".parse::<Dir>().unwrap(), Dir::Horiz);
        assert!("diagonal".parse::<Dir>().is_err());
    }
}
