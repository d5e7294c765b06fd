use memgen::layers::{Layer, MetalStack};

pub const NWELL: &str = "nwell";
pub const DIFF: &str = "diff";
pub const TAP: &str = "tap";
pub const POLY: &str = "poly";
pub const NSDM: &str = "nsdm";
pub const PSDM: &str = "psdm";
pub const NPC: &str = "npc";
pub const LICON1: &str = "licon1";
pub const LI1: &str = "li1";
pub const MCON: &str = "mcon";
pub const MET1: &str = "met1";
pub const VIA: &str = "via";
pub const MET2: &str = "met2";
pub const VIA2: &str = "via2";
pub const MET3: &str = "met3";
pub const VIA3: &str = "via3";
pub const MET4: &str = "met4";
pub const VIA4: &str = "via4";
pub const MET5: &str = "met5";

/// The routing layers from `li1` up to `met5`.
pub fn metals() -> MetalStack {
    MetalStack::new(
        [LI1, MET1, MET2, MET3, MET4, MET5]
            .into_iter()
            .map(Layer::new)
            .collect(),
        [MCON, VIA, VIA2, VIA3, VIA4]
            .into_iter()
            .map(Layer::new)
            .collect(),
    )
}
