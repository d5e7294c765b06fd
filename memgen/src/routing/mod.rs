//! Signal and supply routing between placed instances.

use memgeom::{Sign, Span};
use serde::{Deserialize, Serialize};

pub mod bus;

pub use bus::{allocate_bends, bend_via, route_bus, BusError, BusParams, BusParamsBuilder, BusRoute, PinRef};

/// The direction in which successive bend coordinates move.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum BendOrder {
    /// Line `i + 1` bends above line `i`.
    #[default]
    Ascending,
    /// Line `i + 1` bends below line `i`.
    Descending,
}

impl BendOrder {
    /// Grows toward whichever side of the first bend has more room.
    ///
    /// Ties favor [`BendOrder::Ascending`].
    pub fn from_clearance(below: i64, above: i64) -> Self {
        if above >= below {
            Self::Ascending
        } else {
            Self::Descending
        }
    }

    #[inline]
    pub fn sign(&self) -> Sign {
        match self {
            Self::Ascending => Sign::Pos,
            Self::Descending => Sign::Neg,
        }
    }
}

/// A sorted, merged set of coordinate bands that routes must avoid.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenRanges {
    spans: Vec<Span>,
}

impl ForbiddenRanges {
    /// Sorts the given bands and merges any that overlap or touch.
    pub fn new(spans: impl IntoIterator<Item = Span>) -> Self {
        Self {
            spans: Span::merge_adjacent(spans, |cur, next| next.start() <= cur.stop()).collect(),
        }
    }

    #[inline]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Adds a band, keeping the set sorted and merged.
    pub fn insert(&mut self, span: Span) {
        let spans = std::mem::take(&mut self.spans);
        *self = Self::new(spans.into_iter().chain(std::iter::once(span)));
    }

    /// The first band sharing a region of positive length with `span`.
    pub fn first_overlap(&self, span: Span) -> Option<Span> {
        self.spans.iter().copied().find(|band| band.overlaps(&span))
    }

    /// Returns true if `span` overlaps no band.
    pub fn admits(&self, span: Span) -> bool {
        self.first_overlap(span).is_none()
    }

    /// The nearest start coordinate at or beyond `start` (in the direction of `sign`)
    /// for a segment of `length` that overlaps no band.
    ///
    /// Whenever the segment lands in a band, it is moved to `margin` past the
    /// band edge and the search continues from there. A negative `margin` or
    /// `length` could move the segment back into the band it left, so both are
    /// rejected.
    pub fn next_admissible(
        &self,
        start: i64,
        length: i64,
        margin: i64,
        sign: Sign,
    ) -> Result<i64, BusError> {
        if margin < 0 {
            return Err(BusError::NegativeMargin(margin));
        }
        if length < 0 {
            return Err(BusError::InvalidWidth(length));
        }
        let mut start = start;
        while let Some(band) = self.first_overlap(Span::with_start_and_length(start, length)) {
            start = match sign {
                Sign::Pos => band.stop() + margin,
                Sign::Neg => band.start() - margin - length,
            };
        }
        Ok(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_sorted_and_merged() {
        let ranges = ForbiddenRanges::new([
            Span::new(50, 60),
            Span::new(10, 20),
            Span::new(15, 30),
            Span::new(30, 35),
        ]);
        assert_eq!(ranges.spans(), &[Span::new(10, 35), Span::new(50, 60)]);
    }

    #[test]
    fn next_admissible_skips_bands() {
        let ranges = ForbiddenRanges::new([Span::new(10, 20), Span::new(24, 40)]);
        assert_eq!(ranges.next_admissible(0, 5, 2, Sign::Pos), Ok(0));
        // Lands in [10, 20), moves to 22, overlaps [24, 40), moves to 42.
        assert_eq!(ranges.next_admissible(8, 5, 2, Sign::Pos), Ok(42));
        assert_eq!(ranges.next_admissible(30, 5, 2, Sign::Neg), Ok(3));
    }

    #[test]
    fn next_admissible_rejects_negative_margin() {
        let ranges = ForbiddenRanges::new([Span::new(900, 1500)]);
        assert_eq!(
            ranges.next_admissible(1000, 300, -1, Sign::Pos),
            Err(BusError::NegativeMargin(-1))
        );
        assert_eq!(
            ranges.next_admissible(1000, 300, -1, Sign::Neg),
            Err(BusError::NegativeMargin(-1))
        );
    }

    #[test]
    fn bend_order_prefers_roomier_side() {
        assert_eq!(BendOrder::from_clearance(100, 400), BendOrder::Ascending);
        assert_eq!(BendOrder::from_clearance(400, 100), BendOrder::Descending);
        assert_eq!(BendOrder::from_clearance(5, 5), BendOrder::Ascending);
    }
}
