//! littoral: time-stepped water-column and sediment biogeochemistry
//!
//! The facade crate re-exports the grid, pool and forcing primitives
//! from `littoral-core` together with the eutrophication systems and
//! simulation driver from `littoral-eutro`. Most applications only
//! need [`eutro::parameters::SimulationConfig`], a [`core::mesh::Mesh`]
//! and the [`eutro::simulation::Simulation`] loop.

pub use littoral_core as core;
pub use littoral_eutro as eutro;

pub use littoral_core::errors::{LittoralError, LittoralResult};
pub use littoral_core::mesh::{GridShape, Mesh};
pub use littoral_eutro::reactor::{Drivers, Reactor, System};
pub use littoral_eutro::simulation::{Clock, Forcing, Simulation};
