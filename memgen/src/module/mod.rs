//! Hierarchical layout modules.
//!
//! A [`Module`] owns its rectangles, its pins and its child [`Instance`]s.
//! Modules are built once by a single construction pass, then [frozen](Module::freeze)
//! and shared by reference as sub-modules of larger designs.

use std::sync::Arc;

use arcstr::ArcStr;
use memgeom::bbox::{Bbox, BoundBox};
use memgeom::transform::{Transform, Transformation, Translate};
use memgeom::{Point, Rect};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

use crate::contact::PlacedContact;
use crate::layers::Layer;

pub mod instance;
pub mod net;

pub use instance::{Instance, InstanceBuilder};
pub use net::{Net, Terminal};

new_key_type! {
    /// A unique identifier for modules.
    pub struct ModuleKey;
}

/// A rectangle on a layer, optionally tagged with the net it carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Element {
    pub net: Option<ArcStr>,
    pub layer: Layer,
    pub rect: Rect,
}

impl Element {
    pub fn new(layer: impl Into<Layer>, rect: Rect) -> Self {
        Self {
            net: None,
            layer: layer.into(),
            rect,
        }
    }

    pub fn with_net_name(net: impl Into<ArcStr>, layer: impl Into<Layer>, rect: Rect) -> Self {
        Self {
            net: Some(net.into()),
            layer: layer.into(),
            rect,
        }
    }
}

impl Transform for Element {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            net: self.net.clone(),
            layer: self.layer.clone(),
            rect: self.rect.transform(trans),
        }
    }
}

impl Translate for Element {
    fn translate(&mut self, p: Point) {
        self.rect.translate(p);
    }
}

impl BoundBox for Element {
    fn bbox(&self) -> Bbox {
        self.rect.bbox()
    }
}

/// A declared pin and its physical shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    name: ArcStr,
    shapes: Vec<Element>,
}

impl Pin {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn shapes(&self) -> &[Element] {
        &self.shapes
    }
}

/// An enumeration of module construction errors.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ModuleError {
    #[error("instance {instance} has {found} connections but its module declares {expected} pins")]
    ConnectionCount {
        instance: ArcStr,
        expected: usize,
        found: usize,
    },

    #[error("module {module} has no pin named {pin}")]
    UnknownPin { module: ArcStr, pin: ArcStr },

    #[error("pin {pin} of module {module} has no physical shapes")]
    MissingPinShape { module: ArcStr, pin: ArcStr },

    #[error("pin {0} is declared more than once")]
    DuplicatePin(ArcStr),

    #[error("module {module} already has an instance named {instance}")]
    DuplicateInstance { module: ArcStr, instance: ArcStr },

    #[error("module {module} has no instance named {instance}")]
    InstanceNotFound { module: ArcStr, instance: ArcStr },

    #[error("module {0} has already been normalized")]
    AlreadyNormalized(ArcStr),
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
struct Cache {
    bbox: Bbox,
}

/// A named hierarchical layout cell.
#[derive(Debug, Clone, Default)]
pub struct Module {
    id: ModuleKey,
    name: ArcStr,
    pins: Vec<Pin>,
    elems: Vec<Element>,
    insts: Vec<Instance>,
    /// Values computed once the module is frozen.
    cache: Option<Cache>,
    normalized: bool,
}

impl Module {
    /// Creates an empty module with the given ordered pin list.
    pub fn new(
        name: impl Into<ArcStr>,
        pins: impl IntoIterator<Item = impl Into<ArcStr>>,
    ) -> Result<Self, ModuleError> {
        let mut module = Self {
            name: name.into(),
            ..Default::default()
        };
        for pin in pins {
            let pin = pin.into();
            if module.pins.iter().any(|p| p.name == pin) {
                return Err(ModuleError::DuplicatePin(pin));
            }
            module.pins.push(Pin {
                name: pin,
                shapes: Vec::new(),
            });
        }
        Ok(module)
    }

    #[inline]
    pub fn id(&self) -> ModuleKey {
        self.id
    }

    #[inline]
    pub(crate) fn set_id(&mut self, id: ModuleKey) {
        self.id = id;
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub(crate) fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    /// The ordered pin names.
    pub fn pins(&self) -> impl Iterator<Item = &ArcStr> {
        self.pins.iter().map(|p| &p.name)
    }

    #[inline]
    pub fn num_pins(&self) -> usize {
        self.pins.len()
    }

    fn pin_index(&self, name: &str) -> Result<usize, ModuleError> {
        self.pins
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ModuleError::UnknownPin {
                module: self.name.clone(),
                pin: ArcStr::from(name),
            })
    }

    /// The physical shapes of the pin named `name`.
    pub fn get_pin(&self, name: &str) -> Result<&[Element], ModuleError> {
        Ok(&self.pins[self.pin_index(name)?].shapes)
    }

    /// The physical shapes of the pin named `name` on `layer`.
    pub fn get_pin_on(&self, name: &str, layer: &Layer) -> Result<Vec<Rect>, ModuleError> {
        Ok(self
            .get_pin(name)?
            .iter()
            .filter(|e| &e.layer == layer)
            .map(|e| e.rect)
            .collect())
    }

    /// Attaches a physical shape to a declared pin.
    pub fn add_pin_shape(
        &mut self,
        name: &str,
        layer: impl Into<Layer>,
        rect: Rect,
    ) -> Result<(), ModuleError> {
        debug_assert!(!self.is_frozen());
        let idx = self.pin_index(name)?;
        let pin = &mut self.pins[idx];
        pin.shapes
            .push(Element::with_net_name(pin.name.clone(), layer, rect));
        Ok(())
    }

    pub fn elems(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    pub fn insts(&self) -> impl Iterator<Item = &Instance> {
        self.insts.iter()
    }

    /// Looks up a child instance by name.
    pub fn instance(&self, name: &str) -> Result<&Instance, ModuleError> {
        self.insts
            .iter()
            .find(|inst| inst.name() == name)
            .ok_or_else(|| ModuleError::InstanceNotFound {
                module: self.name.clone(),
                instance: ArcStr::from(name),
            })
    }

    pub fn add(&mut self, elem: Element) {
        debug_assert!(!self.is_frozen());
        self.elems.push(elem);
    }

    pub fn add_elements(&mut self, elems: impl IntoIterator<Item = Element>) {
        debug_assert!(!self.is_frozen());
        self.elems.extend(elems);
    }

    #[inline]
    pub fn draw_rect(&mut self, layer: impl Into<Layer>, rect: Rect) {
        self.add(Element::new(layer, rect));
    }

    /// Draws every shape of a placed contact, tagged with `net` if given.
    pub fn add_contact(&mut self, contact: &PlacedContact, net: Option<&ArcStr>) {
        debug_assert!(!self.is_frozen());
        self.elems
            .extend(contact.shapes().map(|(layer, rect)| Element {
                net: net.cloned(),
                layer,
                rect,
            }));
    }

    /// Places a child instance.
    ///
    /// Fails if the instance's connection list does not match the pin list of
    /// its module, or if an instance of the same name already exists.
    pub fn add_instance(&mut self, inst: Instance) -> Result<(), ModuleError> {
        debug_assert!(!self.is_frozen());
        inst.check_connections()?;
        if self.insts.iter().any(|i| i.name() == inst.name()) {
            return Err(ModuleError::DuplicateInstance {
                module: self.name.clone(),
                instance: inst.name().clone(),
            });
        }
        self.insts.push(inst);
        Ok(())
    }

    /// Creates a rectangular [`Bbox`] surrounding all geometry in the module.
    pub fn bbox(&self) -> Bbox {
        if let Some(ref cache) = self.cache {
            return cache.bbox;
        }
        let mut bbox = Bbox::empty();
        for elem in self.elems.iter() {
            bbox = bbox.union(elem.bbox());
        }
        for elem in self.pins.iter().flat_map(|p| p.shapes.iter()) {
            bbox = bbox.union(elem.bbox());
        }
        for inst in self.insts.iter() {
            bbox = bbox.union(inst.bbox());
        }
        bbox
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.bbox().width()
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.bbox().height()
    }

    /// Every rectangle on `layer`, including pin shapes and the geometry of
    /// child instances, in this module's coordinates.
    pub fn shapes_on<'a>(&'a self, layer: &'a Layer) -> Box<dyn Iterator<Item = Rect> + 'a> {
        let recur = self.insts.iter().flat_map(move |inst| inst.shapes_on(layer));
        let curr = self
            .elems
            .iter()
            .chain(self.pins.iter().flat_map(|p| p.shapes.iter()))
            .filter(move |elem| &elem.layer == layer)
            .map(|elem| elem.rect);
        Box::new(curr.chain(recur))
    }

    /// Translates the whole design so that its lower-left corner sits at the origin.
    ///
    /// May be called at most once per module.
    pub fn normalize_origin(&mut self) -> Result<(), ModuleError> {
        if self.normalized {
            return Err(ModuleError::AlreadyNormalized(self.name.clone()));
        }
        self.normalized = true;
        let bbox = self.bbox();
        if bbox.is_empty() {
            return Ok(());
        }
        let offset = Point::zero() - bbox.p0;
        for elem in self.elems.iter_mut() {
            elem.translate(offset);
        }
        for elem in self.pins.iter_mut().flat_map(|p| p.shapes.iter_mut()) {
            elem.translate(offset);
        }
        for inst in self.insts.iter_mut() {
            inst.translate(offset);
        }
        if self.cache.is_some() {
            self.compute_cache();
        }
        Ok(())
    }

    #[inline]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Freezes the module, checking that every declared pin has a physical shape.
    pub fn freeze(&mut self) -> Result<(), ModuleError> {
        if let Some(pin) = self.pins.iter().find(|p| p.shapes.is_empty()) {
            return Err(ModuleError::MissingPinShape {
                module: self.name.clone(),
                pin: pin.name.clone(),
            });
        }
        self.compute_cache();
        Ok(())
    }

    /// Freezes the module and wraps it for sharing.
    pub fn into_frozen(mut self) -> Result<Arc<Self>, ModuleError> {
        self.freeze()?;
        Ok(Arc::new(self))
    }

    /// Returns true if the module is frozen.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.cache.is_some()
    }

    fn compute_cache(&mut self) {
        self.cache = None;
        let cache = Cache { bbox: self.bbox() };
        self.cache = Some(cache);
    }
}

impl BoundBox for Module {
    fn bbox(&self) -> Bbox {
        Module::bbox(self)
    }
}
