//! Contact and via arrays.
//!
//! A [`Contact`] is an immutable value describing a rectangular array of cuts
//! between the two routing layers of a [`LayerStack`], together with the
//! footprint each routing layer needs to enclose the array.

use std::fmt::Display;
use std::sync::Arc;

use derive_builder::Builder;
use memgeom::bbox::BoundBox;
use memgeom::orientation::Named;
use memgeom::transform::{Transform, Transformation};
use memgeom::{Dims, Dir, Point, Rect, Sides};
use serde::{Deserialize, Serialize};

use crate::layers::{Layer, LayerStack};
use crate::rules::ViaRules;

pub mod sizing;

pub use sizing::{BodyContact, ContactSearch, ContactSearchBuilder, ContactSizer};

/// The implant a contact lands in.
///
/// Contacts in an implant need extra bottom-layer enclosure along the relaxed direction.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Implant {
    N,
    P,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ContactParams {
    pub stack: LayerStack,
    /// Number of cuts stacked vertically.
    #[builder(default = "1")]
    pub rows: usize,
    /// Number of cuts placed side by side horizontally.
    #[builder(default = "1")]
    pub cols: usize,
    /// The "relaxed" direction, ie. the direction in which there is more margin
    /// for one-sided enclosures.
    #[builder(default)]
    pub dir: Dir,
    #[builder(default)]
    pub implant: Option<Implant>,
}

impl ContactParams {
    #[inline]
    pub fn builder() -> ContactParamsBuilder {
        ContactParamsBuilder::default()
    }

    /// A single column of `rows` cuts.
    pub fn column(stack: LayerStack, rows: usize, dir: Dir, implant: Option<Implant>) -> Self {
        Self {
            stack,
            rows,
            cols: 1,
            dir,
            implant,
        }
    }
}

impl Display for ContactParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}x{}{}",
            self.stack,
            self.rows,
            self.cols,
            self.dir.short_form()
        )?;
        match self.implant {
            Some(Implant::N) => write!(f, "_n"),
            Some(Implant::P) => write!(f, "_p"),
            None => Ok(()),
        }
    }
}

/// A rectangular cut array and the footprints enclosing it.
///
/// All geometry is centered on the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    params: ContactParams,
    cuts: Vec<Rect>,
    bot: Rect,
    top: Rect,
}

impl Contact {
    /// Draws the contact described by `params` using the cut and enclosure
    /// values in `rules`.
    ///
    /// # Panics
    ///
    /// Panics if `params` asks for zero rows or zero columns.
    pub fn new(params: ContactParams, rules: &ViaRules) -> Self {
        assert!(params.rows > 0 && params.cols > 0);
        let pitch = rules.pitch();
        let array = Rect::from_center_and_dims(
            Point::zero(),
            Dims::new(
                rules.array_length(params.cols),
                rules.array_length(params.rows),
            ),
        );

        let mut cuts = Vec::with_capacity(params.rows * params.cols);
        for i in 0..params.rows {
            for j in 0..params.cols {
                let ll = Point::new(
                    array.left() + j as i64 * pitch,
                    array.bottom() + i as i64 * pitch,
                );
                cuts.push(Rect::from_ll_and_dims(ll, Dims::square(rules.size)));
            }
        }

        let implant = if params.implant.is_some() {
            rules.implant_enclosure
        } else {
            0
        };
        let bot = array.expand_sides(Sides::with_dir(
            params.dir,
            rules.bot_enclosure_one.max(rules.bot_enclosure) + implant,
            rules.bot_enclosure,
        ));
        let top = array.expand_sides(Sides::with_dir(
            params.dir,
            rules.top_enclosure_one.max(rules.top_enclosure),
            rules.top_enclosure,
        ));

        Self {
            params,
            cuts,
            bot,
            top,
        }
    }

    #[inline]
    pub fn params(&self) -> &ContactParams {
        &self.params
    }

    #[inline]
    pub fn stack(&self) -> &LayerStack {
        &self.params.stack
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.params.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.params.cols
    }

    #[inline]
    pub fn cuts(&self) -> &[Rect] {
        &self.cuts
    }

    /// The footprint on the bottom layer of the stack.
    #[inline]
    pub fn bot_footprint(&self) -> Rect {
        self.bot
    }

    /// The footprint on the top layer of the stack.
    #[inline]
    pub fn top_footprint(&self) -> Rect {
        self.top
    }

    /// The footprint on `layer`, if `layer` is one of the routing layers of the stack.
    pub fn footprint(&self, layer: &Layer) -> Option<Rect> {
        if layer == &self.params.stack.bot {
            Some(self.bot)
        } else if layer == &self.params.stack.top {
            Some(self.top)
        } else {
            None
        }
    }

    /// The larger of the two footprint heights.
    pub fn height(&self) -> i64 {
        self.bot.height().max(self.top.height())
    }

    /// The larger of the two footprint widths.
    pub fn width(&self) -> i64 {
        self.bot.width().max(self.top.width())
    }

    /// Every shape of the contact: the two footprints followed by the cuts.
    pub fn shapes(&self) -> impl Iterator<Item = (Layer, Rect)> + '_ {
        let stack = &self.params.stack;
        [(stack.bot.clone(), self.bot), (stack.top.clone(), self.top)]
            .into_iter()
            .chain(self.cuts.iter().map(|r| (stack.cut.clone(), *r)))
    }
}

impl BoundBox for Contact {
    fn bbox(&self) -> memgeom::bbox::Bbox {
        self.bot.bbox().union(self.top.bbox())
    }
}

/// A [`Contact`] placed at a location, optionally rotated by 90 degrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedContact {
    contact: Arc<Contact>,
    center: Point,
    rotated: bool,
}

impl PlacedContact {
    pub fn new(contact: Arc<Contact>, center: Point) -> Self {
        Self {
            contact,
            center,
            rotated: false,
        }
    }

    /// Rotates the contact by 90 degrees about its center.
    pub fn rotated(mut self) -> Self {
        self.rotated = !self.rotated;
        self
    }

    #[inline]
    pub fn contact(&self) -> &Arc<Contact> {
        &self.contact
    }

    #[inline]
    pub fn center(&self) -> Point {
        self.center
    }

    pub fn transformation(&self) -> Transformation {
        let orientation = if self.rotated { Named::R90 } else { Named::Default };
        Transformation::with_loc_and_orientation(self.center, orientation)
    }

    /// The placed footprint on `layer`.
    pub fn footprint(&self, layer: &Layer) -> Option<Rect> {
        let tf = self.transformation();
        self.contact.footprint(layer).map(|r| r.transform(tf))
    }

    /// All shapes of the contact in the coordinates of its parent.
    pub fn shapes(&self) -> impl Iterator<Item = (Layer, Rect)> + '_ {
        let tf = self.transformation();
        self.contact
            .shapes()
            .map(move |(layer, rect)| (layer, rect.transform(tf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleDeck;
    use crate::tests::test_rules;

    #[test]
    fn contact_geometry_follows_enclosure_rules() {
        let rules = test_rules();
        let stack = LayerStack::new("m1", "via1", "m2");
        let via = rules.via(&stack).unwrap();
        let ct = Contact::new(
            ContactParams::builder()
                .stack(stack)
                .rows(2)
                .cols(1)
                .dir(Dir::Vert)
                .build()
                .unwrap(),
            &via,
        );
        assert_eq!(ct.cuts().len(), 2);
        // 2 * 150 + 170 = 470 tall, 150 wide.
        assert_eq!(ct.bot_footprint().height(), 470 + 2 * 85);
        assert_eq!(ct.bot_footprint().width(), 150 + 2 * 55);
        assert_eq!(ct.height(), 640);
        assert_eq!(ct.bot_footprint().center(), Point::zero());
        assert_eq!(format!("{}", ct.params()), "m1_via1_m2_2x1v");
    }

    #[test]
    fn implant_widens_bottom_footprint() {
        let rules = test_rules();
        let stack = LayerStack::new("diff", "licon", "li");
        let via = rules.via(&stack).unwrap();
        let plain = Contact::new(
            ContactParams::column(stack.clone(), 1, Dir::Horiz, None),
            &via,
        );
        let tapped = Contact::new(
            ContactParams::column(stack, 1, Dir::Horiz, Some(Implant::P)),
            &via,
        );
        assert_eq!(
            tapped.bot_footprint().width(),
            plain.bot_footprint().width() + 2 * 60
        );
        assert_eq!(tapped.top_footprint(), plain.top_footprint());
    }

    #[test]
    fn rotated_contact_swaps_dimensions() {
        let rules = test_rules();
        let stack = LayerStack::new("m1", "via1", "m2");
        let via = rules.via(&stack).unwrap();
        let ct = Arc::new(Contact::new(
            ContactParams::column(stack, 3, Dir::Vert, None),
            &via,
        ));
        let placed = PlacedContact::new(ct.clone(), Point::new(1000, 500)).rotated();
        let fp = placed.footprint(&Layer::new("m2")).unwrap();
        assert_eq!(fp.width(), ct.top_footprint().height());
        assert_eq!(fp.height(), ct.top_footprint().width());
        assert_eq!(fp.center(), Point::new(1000, 500));
        assert_eq!(placed.shapes().count(), 5);
    }
}
