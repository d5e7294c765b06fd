#![allow(dead_code)]

use std::sync::Arc;

use lazy_static::lazy_static;
use memgen::config::{GeneratorConfig, PowerLevelConfig};
use memgen::data::MemgenCtx;
use memgen::geom::{Dir, Rect, Span};
use memgen::layers::LayerStack;
use memgen::module::{Instance, Module};
use memgen::registry::BankVariant;
use memgen::rules::{RuleDeck, RuleTable, ViaRules};
use sky130_pdk::layers::{MET1, MET2, MET3, MET4};
use sky130_pdk::Sky130Pdk;

lazy_static! {
    /// The SKY130 rule deck.
    pub static ref SKY130: Arc<dyn RuleDeck> = Sky130Pdk::deck();

    /// A deck with a single bare cut stack: 5 nm cuts on a 7 nm pitch, no enclosure.
    pub static ref TOY: Arc<dyn RuleDeck> = Arc::new(
        RuleTable::new(1)
            .with_layer("c0", 5, 2, 25)
            .with_layer("c1", 5, 2, 25)
            .with_via(
                toy_stack(),
                ViaRules {
                    size: 5,
                    space: 2,
                    ..Default::default()
                },
            ),
    );
}

pub fn toy_stack() -> LayerStack {
    LayerStack::new("c0", "cut", "c1")
}

pub fn m1_m2() -> LayerStack {
    LayerStack::new(MET1, "via", MET2)
}

pub fn m2_m3() -> LayerStack {
    LayerStack::new(MET2, "via2", MET3)
}

pub fn config(variant: BankVariant) -> GeneratorConfig {
    GeneratorConfig::builder()
        .variant(variant)
        .grid(5)
        .metals(Sky130Pdk::new().metals())
        .build()
        .unwrap()
}

/// A config with vertical `met3` straps over horizontal `met4` straps.
pub fn grid_config(variant: BankVariant) -> GeneratorConfig {
    let mut config = config(variant);
    config.power.levels = vec![
        PowerLevelConfig::builder()
            .layer(MET3)
            .dir(Dir::Vert)
            .width(400)
            .space(400)
            .build()
            .unwrap(),
        PowerLevelConfig::builder()
            .layer(MET4)
            .dir(Dir::Horiz)
            .width(600)
            .space(600)
            .build()
            .unwrap(),
    ];
    config
}

pub fn setup_ctx(config: GeneratorConfig) -> MemgenCtx {
    MemgenCtx::new(config, SKY130.clone()).unwrap()
}

pub fn rect(x0: i64, x1: i64, y0: i64, y1: i64) -> Rect {
    Rect::from_spans(Span::new(x0, x1), Span::new(y0, y1))
}

/// A row of `n` data pins `d0..d{n-1}` on `met2`, 500 nm apart, with `vdd`
/// and `vss` rails on `met1`.
pub fn driver(n: usize) -> Module {
    let mut pins: Vec<String> = (0..n).map(|i| format!("d{i}")).collect();
    pins.push("vdd".to_string());
    pins.push("vss".to_string());
    let mut m = Module::new("driver", pins).unwrap();
    let w = 500 * n as i64;
    for i in 0..n {
        let x = 500 * i as i64;
        m.add_pin_shape(&format!("d{i}"), MET2, rect(x, x + 140, 0, 400))
            .unwrap();
    }
    m.add_pin_shape("vdd", MET1, rect(0, w, 600, 800)).unwrap();
    m.add_pin_shape("vss", MET1, rect(0, w, -400, -200)).unwrap();
    m
}

/// Connections for a driver: `d{i}` to `b{i}`, followed by the supplies.
pub fn driver_nets(n: usize) -> Vec<String> {
    let mut nets: Vec<String> = (0..n).map(|i| format!("b{i}")).collect();
    nets.push("vdd".to_string());
    nets.push("vss".to_string());
    nets
}

/// A parent module with a driver `src` at the origin and a horizontally
/// mirrored driver `dst` at `(3000, 6000)`.
pub fn mirrored_pair(n: usize) -> Module {
    let driver = driver(n).into_frozen().unwrap();
    let mut top = Module::new("pair", Vec::<&str>::new()).unwrap();
    let src = Instance::new("src", driver.clone(), driver_nets(n)).unwrap();
    let mut dst = Instance::new("dst", driver, driver_nets(n)).unwrap();
    dst.set_loc((3000, 6000));
    dst.reflect_horiz_anchored();
    top.add_instance(src).unwrap();
    top.add_instance(dst).unwrap();
    top
}
