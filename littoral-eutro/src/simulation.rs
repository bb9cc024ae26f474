//! Simulation Driver
//!
//! Marches a [`Reactor`] through time: each step advances the registered
//! forcings along their interpolation slopes, applies them to their
//! target pools, runs the reaction pipeline against the current drivers
//! and volumes, and advances the clock. Forcing records stream in
//! through [`Simulation::read_forcing`], which treats malformed input as
//! recoverable and only logs it; a missing forcing target is a
//! configuration error and fails the step.

use littoral_core::errors::LittoralResult;
use littoral_core::forcing::Condition;
use ndarray::Array2;

use crate::reactor::{Drivers, Reactor};

/// Step clock in days.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: f64,
    time: f64,
    dt: f64,
}

impl Clock {
    pub fn new(start: f64, dt: f64) -> Self {
        Self {
            start,
            time: start,
            dt,
        }
    }

    /// Current simulation time [days].
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Time simulated since the start [days].
    pub fn elapsed(&self) -> f64 {
        self.time - self.start
    }

    pub fn advance(&mut self) {
        self.time += self.dt;
    }
}

/// One time-varying condition bound to a system pool by name.
#[derive(Debug, Clone)]
pub struct Forcing {
    /// Target system name.
    pub system: String,
    /// Target pool key.
    pub pool: String,
    pub condition: Condition,
}

impl Forcing {
    pub fn new(system: &str, pool: &str, condition: Condition) -> Self {
        Self {
            system: system.to_string(),
            pool: pool.to_string(),
            condition,
        }
    }
}

/// A reactor marching in time under ambient drivers and forcings.
#[derive(Debug, Clone)]
pub struct Simulation {
    clock: Clock,
    reactor: Reactor,
    drivers: Drivers,
    volume: Array2<f64>,
    forcings: Vec<Forcing>,
}

impl Simulation {
    /// Wrap a built reactor; volumes start from the mesh.
    pub fn new(reactor: Reactor, drivers: Drivers, clock: Clock) -> Self {
        let volume = reactor.mesh().volume().clone();
        Self {
            clock,
            reactor,
            drivers,
            volume,
            forcings: Vec::new(),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn reactor_mut(&mut self) -> &mut Reactor {
        &mut self.reactor
    }

    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    /// Ambient fields, replaceable between steps as the outside
    /// transport model updates them.
    pub fn drivers_mut(&mut self) -> &mut Drivers {
        &mut self.drivers
    }

    /// Replace the cell volumes used to commit each step.
    pub fn set_volume(&mut self, volume: Array2<f64>) -> LittoralResult<()> {
        let expected = self.reactor.mesh().shape().dim();
        if volume.dim() != expected {
            return Err(littoral_core::errors::LittoralError::ShapeMismatch {
                field: "volume".to_string(),
                expected,
                found: volume.dim(),
            });
        }
        self.volume = volume;
        Ok(())
    }

    /// Register a forcing, returning its index for record streaming.
    pub fn add_forcing(&mut self, forcing: Forcing) -> usize {
        self.forcings.push(forcing);
        self.forcings.len() - 1
    }

    pub fn forcings(&self) -> &[Forcing] {
        &self.forcings
    }

    /// Feed one timestamped record into a forcing.
    ///
    /// Returns whether the condition took the record. Malformed records
    /// and unknown indices are recoverable: they are logged and skipped,
    /// and the condition keeps interpolating its previous window.
    pub fn read_forcing(&mut self, index: usize, record: &str, conversion: f64) -> bool {
        let Some(forcing) = self.forcings.get_mut(index) else {
            log::warn!("no forcing registered at index {index}");
            return false;
        };
        match forcing.condition.read(record, conversion) {
            Ok(updated) => updated,
            Err(error) => {
                log::warn!(
                    "forcing record for '{}/{}' rejected: {error}",
                    forcing.system,
                    forcing.pool
                );
                false
            }
        }
    }

    /// One full step: advance and apply the forcings, run the reaction
    /// pipeline, advance the clock.
    pub fn step(&mut self) -> LittoralResult<()> {
        let dt = self.clock.dt();
        for forcing in &mut self.forcings {
            forcing.condition.update(dt);
            let system = self.reactor.system_mut(&forcing.system)?;
            let pool = system.pool_mut(&forcing.pool)?;
            forcing.condition.apply(pool, dt)?;
        }
        log::debug!("stepping reactor at t = {}", self.clock.time());
        self.reactor.step(&self.drivers, &self.volume, dt)?;
        self.clock.advance();
        Ok(())
    }

    /// March the given number of steps.
    pub fn run(&mut self, steps: usize) -> LittoralResult<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use littoral_core::errors::LittoralError;
    use littoral_core::forcing::ConditionMap;
    use littoral_core::mesh::{GridShape, Mesh};
    use ndarray::arr2;

    use crate::carbon::Carbon;
    use crate::oxygen::{Oxygen, OXYGEN};

    fn quiet_simulation() -> Simulation {
        let shape = GridShape::new(1, 2);
        let mesh = Mesh::uniform(shape, 10.0, 20.0, 4.0);
        let reactor = Reactor::builder(mesh)
            .with_carbon(Carbon::new(shape))
            .with_oxygen(Oxygen::new(shape))
            .build()
            .unwrap();
        let drivers = Drivers::uniform(shape, 0.0, 0.0, 0.0, 0.0);
        Simulation::new(reactor, drivers, Clock::new(0.0, 1.0))
    }

    #[test]
    fn the_clock_tracks_elapsed_time() {
        let mut clock = Clock::new(10.0, 0.5);
        for _ in 0..4 {
            clock.advance();
        }
        assert_relative_eq!(clock.time(), 12.0, max_relative = 1e-12);
        assert_relative_eq!(clock.elapsed(), 2.0, max_relative = 1e-12);
    }

    #[test]
    fn a_source_forcing_loads_its_pool_every_step() {
        let mut simulation = quiet_simulation();
        let shape = GridShape::new(1, 2);
        let mut condition = Condition::source(ConditionMap::all(), shape).unwrap();
        condition.set_value(arr2(&[[2.0]])).unwrap();
        simulation.add_forcing(Forcing::new("oxygen", OXYGEN, condition));

        simulation.run(3).unwrap();

        let oxygen = simulation
            .reactor()
            .system("oxygen")
            .unwrap()
            .pool(OXYGEN)
            .unwrap();
        assert_relative_eq!(oxygen.concentration()[[0, 0]], 6.0, max_relative = 1e-12);
        assert_relative_eq!(oxygen.concentration()[[0, 1]], 6.0, max_relative = 1e-12);
        // Two cells at 2.0 per day over three days.
        assert_relative_eq!(
            simulation.forcings()[0].condition.mass(),
            12.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn a_boundary_forcing_pins_the_surface_layer() {
        let mut simulation = quiet_simulation();
        let shape = GridShape::new(1, 2);
        let mut condition = Condition::boundary(ConditionMap::surface(), shape).unwrap();
        condition.set_value(arr2(&[[5.0]])).unwrap();
        simulation.add_forcing(Forcing::new("oxygen", OXYGEN, condition));

        simulation.run(1).unwrap();

        let oxygen = simulation
            .reactor()
            .system("oxygen")
            .unwrap()
            .pool(OXYGEN)
            .unwrap();
        assert_eq!(oxygen.concentration()[[0, 0]], 5.0);
        assert_eq!(oxygen.concentration()[[0, 1]], 0.0);
    }

    #[test]
    fn malformed_records_are_recoverable() {
        let mut simulation = quiet_simulation();
        let shape = GridShape::new(1, 2);
        let condition = Condition::source(ConditionMap::all(), shape)
            .unwrap()
            .varying();
        simulation.add_forcing(Forcing::new("oxygen", OXYGEN, condition));

        assert!(simulation.read_forcing(0, "0.0,3.0", 1.0));
        assert!(!simulation.read_forcing(0, "not,a,number", 1.0));
        // Stale timestamps are rejected the same way.
        assert!(!simulation.read_forcing(0, "0.0,4.0", 1.0));
        // An unknown index never panics.
        assert!(!simulation.read_forcing(7, "1.0,1.0", 1.0));

        // The stream recovers with the next good record.
        assert!(simulation.read_forcing(0, "2.0,5.0", 1.0));
        simulation.run(1).unwrap();
    }

    #[test]
    fn a_missing_forcing_target_fails_the_step() {
        let mut simulation = quiet_simulation();
        let shape = GridShape::new(1, 2);
        let condition = Condition::source(ConditionMap::all(), shape).unwrap();
        simulation.add_forcing(Forcing::new("silica", "silicate", condition));

        let error = simulation.step().unwrap_err();
        assert!(matches!(
            error,
            LittoralError::MissingSystem { ref system } if system == "silica"
        ));
    }

    #[test]
    fn interpolated_sources_follow_their_records() {
        let mut simulation = quiet_simulation();
        let shape = GridShape::new(1, 2);
        let condition = Condition::source(ConditionMap::all(), shape)
            .unwrap()
            .varying();
        simulation.add_forcing(Forcing::new("oxygen", OXYGEN, condition));

        // 1.0 per day at t = 0 rising to 3.0 per day at t = 2.
        assert!(simulation.read_forcing(0, "0.0,1.0", 1.0));
        assert!(simulation.read_forcing(0, "2.0,3.0", 1.0));

        simulation.run(2).unwrap();

        // Steps apply the rate at t = 1 and t = 2: 2.0 + 3.0 per cell.
        let oxygen = simulation
            .reactor()
            .system("oxygen")
            .unwrap()
            .pool(OXYGEN)
            .unwrap();
        assert_relative_eq!(oxygen.concentration()[[0, 0]], 5.0, max_relative = 1e-12);
    }
}
