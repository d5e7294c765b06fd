//! Layer names and via stacks.

use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// A named process layer.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer(ArcStr);

impl Layer {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.0
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Layer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ArcStr> for Layer {
    fn from(value: ArcStr) -> Self {
        Self(value)
    }
}

/// A vertical connection between two routing layers through a cut layer.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerStack {
    /// The lower layer.
    pub bot: Layer,
    /// The cut layer.
    pub cut: Layer,
    /// The upper layer.
    pub top: Layer,
}

impl LayerStack {
    pub fn new(bot: impl Into<Layer>, cut: impl Into<Layer>, top: impl Into<Layer>) -> Self {
        Self {
            bot: bot.into(),
            cut: cut.into(),
            top: top.into(),
        }
    }

    /// Returns true if `layer` is one of the two routing layers of the stack.
    pub fn connects(&self, layer: &Layer) -> bool {
        &self.bot == layer || &self.top == layer
    }
}

impl Display for LayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.bot, self.cut, self.top)
    }
}

/// An ordered list of routing layers and the cuts between them.
///
/// `metals[i]` connects to `metals[i + 1]` through `cuts[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetalStack {
    metals: Vec<Layer>,
    cuts: Vec<Layer>,
}

impl MetalStack {
    /// Creates a metal stack.
    ///
    /// # Panics
    ///
    /// Panics if there is not exactly one fewer cut than metals.
    pub fn new(metals: Vec<Layer>, cuts: Vec<Layer>) -> Self {
        assert_eq!(metals.len(), cuts.len() + 1);
        Self { metals, cuts }
    }

    /// Returns the position of `layer` in the stack, if present.
    pub fn index_of(&self, layer: &Layer) -> Option<usize> {
        self.metals.iter().position(|m| m == layer)
    }

    /// Returns the chain of [`LayerStack`]s joining `from` to `to`, bottom-up.
    ///
    /// Returns [`None`] if either layer is absent from the stack.
    pub fn stacks_between(&self, from: &Layer, to: &Layer) -> Option<Vec<LayerStack>> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        let (lo, hi) = (a.min(b), a.max(b));
        Some(
            (lo..hi)
                .map(|i| {
                    LayerStack::new(
                        self.metals[i].clone(),
                        self.cuts[i].clone(),
                        self.metals[i + 1].clone(),
                    )
                })
                .collect(),
        )
    }
}
