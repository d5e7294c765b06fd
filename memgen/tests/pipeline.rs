use memgen::config::{GeneratorConfig, PowerLevelConfig};
use memgen::error::ErrorContext;
use memgen::geom::{Dir, Point, Rect, Span};
use memgen::module::{Instance, Module};
use memgen::pipeline::{FnStage, StageCtx};
use memgen::registry::BankVariant;
use memgen::routing::{BendOrder, BusRoute, PinRef};
use memgen::rules::SpaceContext;
use sky130_pdk::layers::{MET2, MET3, MET4};

mod common;
use common::{config, m2_m3, mirrored_pair, rect, setup_ctx};

/// The dedicated write supply of a resistive bank, on `met3`.
const WRITE_RAIL: Span = Span::new_unchecked(7_000, 8_000);

/// Horizontal `met3` straps under vertical `met4` straps.
fn bank_config(variant: BankVariant) -> GeneratorConfig {
    let mut config = config(variant);
    config.power.levels = vec![
        PowerLevelConfig::builder()
            .layer(MET3)
            .dir(Dir::Horiz)
            .width(400)
            .space(400)
            .build()
            .unwrap(),
        PowerLevelConfig::builder()
            .layer(MET4)
            .dir(Dir::Vert)
            .width(600)
            .space(600)
            .build()
            .unwrap(),
    ];
    config
}

/// A mirrored driver pair plus a tile carrying the write supply.
fn bank() -> Module {
    let mut supply = Module::new("write_supply", ["vdd_write"]).unwrap();
    supply
        .add_pin_shape("vdd_write", MET3, rect(0, 5000, WRITE_RAIL.start(), WRITE_RAIL.stop()))
        .unwrap();
    let mut top = mirrored_pair(4);
    top.add_instance(Instance::new("wr", supply.into_frozen().unwrap(), ["vdd_write"]).unwrap())
        .unwrap();
    top
}

fn pins(inst: &str) -> Vec<PinRef> {
    (0..4).map(|i| PinRef::new(inst, format!("d{i}"))).collect()
}

fn queue_bus(cx: &mut StageCtx) {
    let params = cx
        .bus_params()
        .h_layer(MET3)
        .v_layer(MET2)
        .stack(m2_m3())
        .width(300)
        .pitch(700)
        .start(2000)
        .legal(Span::new(1000, 5600))
        .order(BendOrder::Ascending)
        .build()
        .unwrap();
    cx.add_bus(params, pins("src"), pins("dst"));
}

#[test]
fn baseline_bank() {
    let ctx = setup_ctx(bank_config(BankVariant::Baseline));
    let mut cx = StageCtx::new(&ctx, bank());
    queue_bus(&mut cx);
    ctx.config().variant.pipeline().run(&mut cx).unwrap();

    assert_eq!(cx.routes().len(), 1);
    let route = &cx.routes()[0];
    assert_eq!(route.rails.len(), 4);

    let grid = cx.grid().unwrap();
    let straps = &grid.levels[0];
    assert!(!straps.is_empty());
    // Straps share met3 with the bus and keep a strap space from its rails.
    for strap in straps.iter() {
        for rail in route.rails.iter() {
            assert!(!strap.rect.vspan().overlaps(&rail.vspan().expand_all(400)));
        }
    }
    // Without reserved supplies the write rail is ignored.
    assert!(straps.iter().any(|s| s.rect.vspan().overlaps(&WRITE_RAIL)));

    assert!(cx.module().is_normalized());
    assert_eq!(cx.module().bbox().p0, Point::zero());
}

#[test]
fn reram_bank_keeps_straps_off_the_write_supply() {
    let ctx = setup_ctx(bank_config(BankVariant::ReRam));
    let mut cx = StageCtx::new(&ctx, bank());
    queue_bus(&mut cx);
    ctx.config().variant.pipeline().run(&mut cx).unwrap();

    let grid = cx.grid().unwrap();
    assert!(!grid.levels[0].is_empty());
    for strap in grid.levels[0].iter() {
        assert!(!strap.rect.vspan().overlaps(&WRITE_RAIL.expand_all(400)));
    }
    // The vertical met4 straps are unaffected by met3 blockages.
    assert!(grid.levels[1]
        .iter()
        .any(|s| s.rect.vspan().contains(WRITE_RAIL)));
}

#[test]
fn custom_stages_run_between_built_in_ones() {
    let ctx = setup_ctx(bank_config(BankVariant::Baseline));
    let mut pipeline = ctx.config().variant.pipeline();
    pipeline.insert_before(
        "build_power_grid",
        Box::new(FnStage::new("keep_out", |cx: &mut StageCtx| {
            cx.add_blockage(MET3, rect(0, 100, -400, 1200));
            Ok(())
        })),
    );
    let mut cx = StageCtx::new(&ctx, bank());
    queue_bus(&mut cx);
    pipeline.run(&mut cx).unwrap();
    for strap in cx.grid().unwrap().levels[0].iter() {
        assert!(strap.rect.bottom() >= 1600);
    }
}

#[test]
fn routing_failures_name_the_stage() {
    let ctx = setup_ctx(bank_config(BankVariant::Baseline));
    let mut cx = StageCtx::new(&ctx, bank());
    let params = cx
        .bus_params()
        .h_layer(MET3)
        .v_layer(MET2)
        .stack(m2_m3())
        .width(300)
        .pitch(700)
        .start(2000)
        .legal(Span::new(1000, 5600))
        .order(BendOrder::Ascending)
        .build()
        .unwrap();
    cx.add_bus(params, pins("src"), pins("wr"));
    let err = ctx.config().variant.pipeline().run(&mut cx).unwrap_err();
    assert_eq!(
        err.context().last(),
        Some(&ErrorContext::Stage {
            module: arcstr::literal!("pair"),
            stage: arcstr::literal!("route_buses"),
        })
    );
}

#[test]
fn buses_of_different_nets_keep_metal_space() {
    let ctx = setup_ctx(bank_config(BankVariant::Baseline));
    let mut cx = StageCtx::new(&ctx, bank());
    for line in ["d0", "d1"] {
        let params = cx
            .bus_params()
            .h_layer(MET3)
            .v_layer(MET2)
            .stack(m2_m3())
            .width(300)
            .pitch(700)
            .start(2000)
            .legal(Span::new(1000, 5600))
            .order(BendOrder::Ascending)
            .build()
            .unwrap();
        cx.add_bus(params, vec![PinRef::new("src", line)], vec![PinRef::new("dst", line)]);
    }
    ctx.config().variant.pipeline().run(&mut cx).unwrap();

    let met3 = |route: &BusRoute| -> Vec<Rect> {
        let pads = route.vias.iter().filter_map(|v| v.footprint(&MET3.into()));
        route.rails.iter().copied().chain(pads).collect()
    };
    let routes = cx.routes();
    let space = ctx
        .rules()
        .min_space(&MET3.into(), SpaceContext::min())
        .unwrap();
    let mut checked = 0;
    for a in met3(&routes[0]) {
        for b in met3(&routes[1]) {
            if a.hspan().overlaps(&b.hspan()) {
                assert!(b.bottom() - a.top() >= space, "{a:?} and {b:?} are too close");
                checked += 1;
            }
        }
    }
    assert!(checked > 0);
}
