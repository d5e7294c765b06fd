use memgen::contact::ContactSizer;
use memgen::geom::{Dir, Span};
use memgen::power::{GridLevel, PowerGridBuilder, SupplyNet, Target};
use sky130_pdk::layers::{MET1, MET3, MET4};
use sky130_pdk::Sky130Pdk;

mod common;
use common::{mirrored_pair, SKY130};

fn met4_level(extent: Span, forbidden: Vec<Span>) -> GridLevel {
    GridLevel::builder()
        .layer(MET4)
        .dir(Dir::Horiz)
        .width(600)
        .space(600)
        .extent(extent)
        .span(Span::new(0, 5_000))
        .forbidden(forbidden)
        .build()
        .unwrap()
}

#[test]
fn roles_alternate_along_every_sweep() {
    let cases = [
        (Span::new(0, 12_000), vec![]),
        (Span::new(-400, 9_000), vec![Span::new(1_000, 1_300)]),
        (
            Span::new(0, 20_000),
            vec![Span::new(2_500, 2_600), Span::new(4_000, 8_000)],
        ),
    ];
    for (extent, forbidden) in cases {
        let straps = met4_level(extent, forbidden).straps().unwrap();
        assert!(!straps.is_empty());
        assert_eq!(straps[0].net, SupplyNet::Gnd);
        for (i, pair) in straps.windows(2).enumerate() {
            assert_ne!(pair[0].net, pair[1].net, "straps {i} and {} share a role", i + 1);
            assert!(pair[0].rect.top() < pair[1].rect.bottom());
        }
        for (i, s) in straps.iter().enumerate() {
            assert_eq!(s.index, i);
        }
    }
}

#[test]
fn forbidden_ranges_inside_the_extent() {
    let bands = [Span::new(3_000, 4_000), Span::new(9_000, 9_500)];
    let straps = met4_level(Span::new(0, 20_000), bands.to_vec())
        .straps()
        .unwrap();
    for strap in straps.iter() {
        for band in bands.iter() {
            assert!(
                !strap.rect.vspan().overlaps(band),
                "strap {:?} overlaps {band}",
                strap.rect
            );
        }
    }
    // The sweep resumes one strap space past each range.
    let bottoms: Vec<i64> = straps.iter().map(|s| s.rect.bottom()).collect();
    assert_eq!(
        bottoms,
        vec![0, 1_200, 2_400, 4_600, 5_800, 7_000, 8_200, 10_100, 11_300, 12_500, 13_700, 14_900, 16_100, 17_300, 18_500]
    );
}

#[test]
fn grid_over_a_mirrored_pair() {
    let sizer = ContactSizer::new(SKY130.clone());
    let mut module = mirrored_pair(4);
    let bbox = module.bbox().into_rect().unwrap();

    let mut targets = Vec::new();
    for inst in module.insts() {
        for (pin, net) in [("vdd", SupplyNet::Vdd), ("vss", SupplyNet::Gnd)] {
            for elem in inst.pin(pin).unwrap() {
                targets.push(Target::new(elem.layer, net, elem.rect));
            }
        }
    }
    assert_eq!(targets.len(), 4);

    let mut builder = PowerGridBuilder::new(Sky130Pdk::new().metals());
    builder
        .add_level(
            GridLevel::builder()
                .layer(MET3)
                .dir(Dir::Vert)
                .width(400)
                .space(400)
                .extent(bbox.hspan())
                .span(bbox.vspan())
                .build()
                .unwrap(),
        )
        .add_level(
            GridLevel::builder()
                .layer(MET4)
                .dir(Dir::Horiz)
                .width(600)
                .space(600)
                .extent(bbox.vspan())
                .span(bbox.hspan())
                .build()
                .unwrap(),
        )
        .add_targets(targets.clone());
    let grid = builder.build(&mut module, &sizer).unwrap();

    assert_eq!(grid.levels.len(), 2);
    assert!(grid.unconnected.is_empty());
    assert!(!grid.crossings.is_empty());

    // Crossings only join straps of the same role.
    for stack in grid.crossings.iter() {
        let c = stack.center().unwrap();
        let lower = grid.levels[0]
            .iter()
            .find(|s| s.rect.contains(c))
            .unwrap();
        let upper = grid.levels[1]
            .iter()
            .find(|s| s.rect.contains(c))
            .unwrap();
        assert_eq!(lower.net, upper.net);
    }

    // Every tap lands on a target and a strap of the same role.
    assert!(grid.taps.len() >= targets.len());
    for stack in grid.taps.iter() {
        let c = stack.center().unwrap();
        assert!(targets.iter().any(|t| {
            t.layer == MET1.into()
                && t.rect.contains(c)
                && grid.levels[0]
                    .iter()
                    .any(|s| s.net == t.net && s.rect.contains(c))
        }));
    }

    // Straps are drawn with their role's net name.
    let vdd_on_met4 = module
        .elems()
        .filter(|e| {
            e.layer == MET4.into()
                && e.net.as_deref() == Some("vdd")
                && e.rect.hspan() == bbox.hspan()
        })
        .count();
    assert_eq!(vdd_on_met4, grid.levels[1].len() / 2);
}
