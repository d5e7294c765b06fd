//! Placements of modules inside other modules.

use std::sync::Arc;

use arcstr::ArcStr;
use derive_builder::Builder;
use memgeom::bbox::{Bbox, BoundBox};
use memgeom::orientation::Orientation;
use memgeom::transform::{Transform, Transformation, Translate};
use memgeom::{Point, Rect};

use super::{Element, Module, ModuleError};
use crate::layers::Layer;

/// An instance of a module in a layout.
///
/// `connections[i]` is the net bound to the `i`-th pin of the instantiated module.
#[derive(Debug, Clone, Builder)]
pub struct Instance {
    /// The instance name.
    #[builder(setter(into))]
    pub(crate) name: ArcStr,
    /// A pointer to the reference module.
    pub(crate) module: Arc<Module>,
    /// Nets bound positionally to the module's pins.
    pub(crate) connections: Vec<ArcStr>,
    /// The location of the module's origin.
    #[builder(default)]
    pub(crate) loc: Point,
    /// The orientation of the module.
    #[builder(default)]
    pub(crate) orientation: Orientation,
}

impl Instance {
    /// Creates a new [`Instance`] at the origin.
    pub fn new(
        name: impl Into<ArcStr>,
        module: Arc<Module>,
        connections: impl IntoIterator<Item = impl Into<ArcStr>>,
    ) -> Result<Self, ModuleError> {
        let inst = Self {
            name: name.into(),
            module,
            connections: connections.into_iter().map(Into::into).collect(),
            loc: Point::zero(),
            orientation: Orientation::default(),
        };
        inst.check_connections()?;
        Ok(inst)
    }

    /// Creates a new [`InstanceBuilder`].
    #[inline]
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    pub(crate) fn check_connections(&self) -> Result<(), ModuleError> {
        let expected = self.module.num_pins();
        if self.connections.len() != expected {
            return Err(ModuleError::ConnectionCount {
                instance: self.name.clone(),
                expected,
                found: self.connections.len(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    #[inline]
    pub fn connections(&self) -> &[ArcStr] {
        &self.connections
    }

    /// The net bound to the module pin named `pin`.
    pub fn net(&self, pin: &str) -> Result<&ArcStr, ModuleError> {
        let idx = self.module.pin_index(pin)?;
        Ok(&self.connections[idx])
    }

    /// Pairs of `(pin, net)` in pin order.
    pub fn bindings(&self) -> impl Iterator<Item = (&ArcStr, &ArcStr)> {
        self.module.pins().zip(self.connections.iter())
    }

    #[inline]
    pub fn transformation(&self) -> Transformation {
        Transformation::with_loc_and_orientation(self.loc, self.orientation)
    }

    #[inline]
    pub fn loc(&self) -> Point {
        self.loc
    }

    #[inline]
    pub fn set_loc(&mut self, p: impl Into<Point>) {
        self.loc = p.into();
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn set_orientation(&mut self, o: impl Into<Orientation>) {
        self.orientation = o.into();
    }

    /// The shapes of pin `name` in the parent's coordinates.
    pub fn pin(&self, name: &str) -> Result<Vec<Element>, ModuleError> {
        let tf = self.transformation();
        Ok(self
            .module
            .get_pin(name)?
            .iter()
            .map(|e| e.transform(tf))
            .collect())
    }

    /// The shapes of pin `name` on `layer` in the parent's coordinates.
    pub fn pin_on(&self, name: &str, layer: &Layer) -> Result<Vec<Rect>, ModuleError> {
        let tf = self.transformation();
        Ok(self
            .module
            .get_pin_on(name, layer)?
            .into_iter()
            .map(|r| r.transform(tf))
            .collect())
    }

    /// Reflects the instance vertically without modifying its bounding box.
    pub fn reflect_vert_anchored(&mut self) -> &mut Self {
        let box0 = self.bbox();
        self.orientation.reflect_vert();
        let box1 = self.bbox();
        self.loc.y += box0.p0.y - box1.p0.y;
        self.loc.x += box0.p0.x - box1.p0.x;

        #[cfg(debug_assertions)]
        {
            let final_box = self.bbox();
            debug_assert_eq!(final_box, box0);
        }
        self
    }

    /// Reflects the instance horizontally without modifying its bounding box.
    pub fn reflect_horiz_anchored(&mut self) -> &mut Self {
        let box0 = self.bbox();
        self.orientation.reflect_horiz();
        let box1 = self.bbox();
        self.loc.x += box0.p0.x - box1.p0.x;
        self.loc.y += box0.p0.y - box1.p0.y;

        #[cfg(debug_assertions)]
        {
            let final_box = self.bbox();
            debug_assert_eq!(final_box, box0);
        }
        self
    }

    pub fn shapes_on<'a>(&'a self, layer: &'a Layer) -> impl Iterator<Item = Rect> + 'a {
        let tf = self.transformation();
        self.module.shapes_on(layer).map(move |r| r.transform(tf))
    }
}

impl BoundBox for Instance {
    fn bbox(&self) -> Bbox {
        match self.module.bbox().into_rect() {
            Some(rect) => rect.transform(self.transformation()).bbox(),
            None => Bbox::empty(),
        }
    }
}

impl Translate for Instance {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}
