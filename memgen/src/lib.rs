//! Layout assembly and routing engine for memory macros.
//!
//! Modules are built once, top-down, and frozen before being shared
//! by reference as sub-modules of larger designs.

pub mod cache;
pub mod clearance;
pub mod config;
pub mod contact;
pub mod data;
pub mod error;
pub mod fingers;
pub mod layers;
pub mod module;
pub mod pipeline;
pub mod power;
pub mod registry;
pub mod routing;
pub mod rules;

pub use memgeom as geom;

#[cfg(test)]
#[allow(unused_imports)]
pub(crate) use std::{
    println as trace, println as debug, println as info, println as warn, println as error,
};

#[cfg(not(test))]
#[allow(unused_imports)]
pub(crate) use log::{debug, error, info, trace, warn};
