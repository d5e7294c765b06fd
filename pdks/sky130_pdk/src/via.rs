use memgen::layers::LayerStack;
use memgen::rules::ViaRules;

use crate::layers::{DIFF, LI1, LICON1, MCON, MET1, MET2, MET3, MET4, MET5, POLY, TAP, VIA, VIA2, VIA3, VIA4};

const fn via(
    size: i64,
    space: i64,
    bot_enclosure: i64,
    bot_enclosure_one: i64,
    top_enclosure: i64,
    top_enclosure_one: i64,
) -> ViaRules {
    ViaRules {
        size,
        space,
        bot_enclosure,
        bot_enclosure_one,
        top_enclosure,
        top_enclosure_one,
        implant_enclosure: 0,
    }
}

/// Cut arrays of every supported stack, bottom-up.
pub fn vias() -> Vec<(LayerStack, ViaRules)> {
    vec![
        (LayerStack::new(DIFF, LICON1, LI1), via(170, 170, 40, 60, 0, 80)),
        (
            LayerStack::new(TAP, LICON1, LI1),
            ViaRules {
                implant_enclosure: 60,
                ..via(170, 170, 0, 120, 0, 80)
            },
        ),
        (LayerStack::new(POLY, LICON1, LI1), via(170, 170, 50, 80, 0, 80)),
        (LayerStack::new(LI1, MCON, MET1), via(170, 190, 0, 0, 30, 60)),
        (LayerStack::new(MET1, VIA, MET2), via(150, 170, 55, 85, 55, 85)),
        (LayerStack::new(MET2, VIA2, MET3), via(200, 200, 40, 85, 65, 65)),
        (LayerStack::new(MET3, VIA3, MET4), via(200, 200, 60, 90, 65, 65)),
        (LayerStack::new(MET4, VIA4, MET5), via(800, 800, 190, 190, 310, 310)),
    ]
}
