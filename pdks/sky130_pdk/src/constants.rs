pub const GRID: i64 = 5;

pub const WIDE_METAL_WIDTH: i64 = 3_000;

pub const LI1_WIDTH: i64 = 170;
pub const LI1_SPACE: i64 = 170;
pub const LI1_AREA: i64 = 56_100;

pub const MET1_WIDTH: i64 = 140;
pub const MET1_SPACE: i64 = 140;
pub const MET1_WIDE_SPACE: i64 = 280;
pub const MET1_AREA: i64 = 83_000;

pub const MET2_WIDTH: i64 = 140;
pub const MET2_SPACE: i64 = 140;
pub const MET2_WIDE_SPACE: i64 = 280;
pub const MET2_AREA: i64 = 67_600;

pub const MET3_WIDTH: i64 = 300;
pub const MET3_SPACE: i64 = 300;
pub const MET3_WIDE_SPACE: i64 = 400;
pub const MET3_AREA: i64 = 240_000;

pub const MET4_WIDTH: i64 = 300;
pub const MET4_SPACE: i64 = 300;
pub const MET4_WIDE_SPACE: i64 = 400;
pub const MET4_AREA: i64 = 240_000;

pub const MET5_WIDTH: i64 = 1_600;
pub const MET5_SPACE: i64 = 1_600;
pub const MET5_AREA: i64 = 4_000_000;

pub const DIFF_WIDTH: i64 = 150;
pub const DIFF_SPACE: i64 = 270;
pub const DIFF_AREA: i64 = 63_000;
pub const POLY_WIDTH: i64 = 150;
pub const POLY_SPACE: i64 = 210;
pub const POLY_AREA: i64 = 22_500;
pub const NWELL_WIDTH: i64 = 840;
pub const NWELL_SPACE: i64 = 1_270;
pub const NWELL_AREA: i64 = 705_600;

pub const DIFF_NWELL_SPACE: i64 = 340;
pub const DIFF_NWELL_ENCLOSURE: i64 = 180;
pub const DIFF_PSDM_ENCLOSURE: i64 = 125;
pub const DIFF_NSDM_ENCLOSURE: i64 = 125;
pub const NPC_LICON_POLY_ENCLOSURE: i64 = 100;
pub const DIFF_POLY_EXTENSION: i64 = 250;
pub const POLY_DIFF_EXTENSION: i64 = 130;
pub const GATE_LICON_SPACE: i64 = 55;
