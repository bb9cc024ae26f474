//! Eutrophication kinetics for littoral
//!
//! This crate provides the coupled reaction systems of a time-stepped
//! water-quality model: organic carbon mineralization, the dissolved
//! oxygen balance, nutrient cycling, phytoplankton growth, particulate
//! settling and a two-layer benthic sediment bed, assembled into a
//! per-step pipeline by the reactor.
//!
//! # Module Organisation
//!
//! Systems are organised by constituent:
//! - `carbon`: particulate and dissolved organic carbon pools with
//!   hydrolysis and oxidation
//! - `oxygen`: dissolved oxygen and reduced oxygen equivalents
//! - `nitrogen`, `phosphorus`, `silica`: nutrient mineralization,
//!   nitrification, denitrification and sorption partitioning
//! - `phytoplankton`: algal groups with nutrient and light limited
//!   growth, respiration and excretion
//! - `settling`: vertical particulate transport and benthic deposition
//! - `sediment`: the two-layer diagenesis bed and its fluxes back to
//!   the bottom water
//! - `reactor`, `simulation`: stage ordering, volume commits, forcings
//!   and the step clock
//!
//! # Parameters
//!
//! Every system has an associated parameters struct in the `parameters`
//! module with defaults for a temperate coastal application, loadable
//! from TOML through [`parameters::SimulationConfig`].

pub mod carbon;
pub mod coupling;
pub mod nitrogen;
pub mod oxygen;
pub mod parameters;
pub mod phosphorus;
pub mod phytoplankton;
pub mod reactor;
pub mod sediment;
pub mod settling;
pub mod silica;
pub mod simulation;
