//! Net connectivity at one level of hierarchy.

use std::collections::BTreeMap;
use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::Module;

/// A pin occurrence joined to a net.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terminal {
    /// A pin of the module itself.
    Pin(ArcStr),
    /// A pin of a child instance.
    Instance { instance: ArcStr, pin: ArcStr },
}

impl Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminal::Pin(pin) => write!(f, "{pin}"),
            Terminal::Instance { instance, pin } => write!(f, "{instance}.{pin}"),
        }
    }
}

/// A named equivalence class of terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub name: ArcStr,
    /// Parent pins first, then instance pins in placement order.
    pub terminals: Vec<Terminal>,
}

impl Net {
    /// Returns true if the net reaches a pin of the module itself.
    pub fn is_exported(&self) -> bool {
        self.terminals
            .iter()
            .any(|t| matches!(t, Terminal::Pin(_)))
    }
}

impl Module {
    /// Every net at this module's level of hierarchy, sorted by name.
    ///
    /// A parent pin belongs to the net of the same name.
    pub fn nets(&self) -> Vec<Net> {
        let mut nets: BTreeMap<ArcStr, Vec<Terminal>> = BTreeMap::new();
        for pin in self.pins() {
            nets.entry(pin.clone())
                .or_default()
                .push(Terminal::Pin(pin.clone()));
        }
        for inst in self.insts() {
            for (pin, net) in inst.bindings() {
                nets.entry(net.clone()).or_default().push(Terminal::Instance {
                    instance: inst.name().clone(),
                    pin: pin.clone(),
                });
            }
        }
        nets.into_iter()
            .map(|(name, terminals)| Net { name, terminals })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use memgeom::Rect;

    use super::*;
    use crate::module::Instance;

    #[test]
    fn nets_join_parent_and_instance_pins() {
        let mut leaf = Module::new("buf", ["a", "y"]).unwrap();
        for pin in ["a", "y"] {
            leaf.add_pin_shape(pin, "m1", Rect::from_spans((0, 10).into(), (0, 10).into()))
                .unwrap();
        }
        let leaf = leaf.into_frozen().unwrap();

        let mut top = Module::new("chain", ["din", "dout"]).unwrap();
        top.add_instance(Instance::new("b0", leaf.clone(), ["din", "mid"]).unwrap())
            .unwrap();
        top.add_instance(Instance::new("b1", leaf, ["mid", "dout"]).unwrap())
            .unwrap();

        let nets = top.nets();
        let names: Vec<&str> = nets.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["din", "dout", "mid"]);
        let mid = &nets[2];
        assert!(!mid.is_exported());
        assert_eq!(
            mid.terminals
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>(),
            vec!["b0.y", "b1.a"]
        );
        assert!(nets[0].is_exported());
    }
}
