//! Via stacks spanning several metal layers.

use memgeom::{Dir, Point, Rect};

use super::PowerGridError;
use crate::contact::{ContactSearch, ContactSizer, PlacedContact};
use crate::error::Result;
use crate::layers::{Layer, MetalStack};
use crate::module::Module;

/// A column of contacts joining two metal layers through every layer in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaStack {
    contacts: Vec<PlacedContact>,
}

impl ViaStack {
    /// Builds the chain of contacts between `from` and `to` centered at `center`.
    ///
    /// Each tier is sized independently for `span`, the length of the region
    /// the stack has to fit in along `dir`.
    pub fn new(
        sizer: &ContactSizer,
        metals: &MetalStack,
        from: &Layer,
        to: &Layer,
        center: Point,
        span: i64,
        dir: Dir,
    ) -> Result<Self> {
        let chain = metals.stacks_between(from, to).ok_or_else(|| {
            PowerGridError::NoViaPath {
                from: from.clone(),
                to: to.clone(),
            }
        })?;
        let mut contacts = Vec::with_capacity(chain.len());
        for stack in chain {
            let contact = sizer.sample_contact(span, &ContactSearch::new(stack))?;
            let placed = PlacedContact::new(contact, center);
            contacts.push(match dir {
                Dir::Vert => placed,
                Dir::Horiz => placed.rotated(),
            });
        }
        Ok(Self { contacts })
    }

    pub(crate) fn from_contacts(contacts: Vec<PlacedContact>) -> Self {
        Self { contacts }
    }

    #[inline]
    pub fn contacts(&self) -> &[PlacedContact] {
        &self.contacts
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// The center of the stack, if it has any tier.
    pub fn center(&self) -> Option<Point> {
        self.contacts.first().map(|c| c.center())
    }

    /// The largest footprint of any tier, measured along `dir`.
    pub fn footprint_length(&self, dir: Dir) -> i64 {
        self.contacts
            .iter()
            .flat_map(|c| c.shapes())
            .map(|(_, rect)| rect.length(dir))
            .max()
            .unwrap_or(0)
    }

    /// The footprint of the stack on `layer`, if any tier lands on it.
    pub fn footprint(&self, layer: &Layer) -> Option<Rect> {
        self.contacts.iter().find_map(|c| c.footprint(layer))
    }

    /// Draws every tier into `module`, tagged with `net`.
    pub fn draw(&self, module: &mut Module, net: &arcstr::ArcStr) {
        for contact in self.contacts.iter() {
            module.add_contact(contact, Some(net));
        }
    }
}
