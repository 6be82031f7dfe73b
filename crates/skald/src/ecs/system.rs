//! # System: Per-Tick Passes Over a Level
//!
//! A system is a pass that runs once per tick against the active
//! [`Level`]. It declares the component kinds it needs as a
//! [`signature`](System::signature) and usually walks the entities that
//! carry all of them.
//!
//! ## Design
//!
//! We keep scheduling deliberately plain:
//!
//! - A system is anything implementing [`System`], including any
//!   `FnMut(&mut Level, &mut Frame)` closure.
//! - Systems run in the order they're added. No dependency graph, no
//!   parallelism.
//! - Systems talk to the tick driver through the [`Frame`]: the input state
//!   comes in, level transitions and the event report go out.
//!
//! The event pass is one of these systems
//! ([`EventSystem`](crate::systems::EventSystem)), so where it runs
//! relative to movement is just a matter of insertion order.

use super::component::ComponentKind;
use super::entity::EntityId;
use crate::game::Transition;
use crate::input::{Input, KeyCode};
use crate::level::Level;
use crate::systems::EventReport;

/// Per-tick context handed to every system.
pub struct Frame<'a> {
    /// Keys held this tick.
    pub input: &'a Input<KeyCode>,
    /// Tick counter, starting at 0.
    pub tick: u64,
    /// Level changes requested during this tick. The engine applies the
    /// first one after the schedule finishes.
    pub transitions: Vec<Transition>,
    /// What the event pass did this tick.
    pub events: EventReport,
}

impl<'a> Frame<'a> {
    pub fn new(input: &'a Input<KeyCode>, tick: u64) -> Self {
        Self {
            input,
            tick,
            transitions: Vec::new(),
            events: EventReport::default(),
        }
    }

    pub fn request(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }
}

/// A pass over the active level.
///
/// Any `FnMut(&mut Level, &mut Frame)` implements this trait, so closures
/// and plain functions work directly.
pub trait System {
    /// Component kinds an entity needs for this system to process it.
    fn signature(&self) -> &[ComponentKind] {
        &[]
    }

    fn run(&mut self, level: &mut Level, frame: &mut Frame<'_>);

    /// Ids of the entities matching [`signature`](Self::signature), in
    /// spawn order.
    fn entities(&self, level: &Level) -> Vec<EntityId> {
        level.entities().with_components(self.signature())
    }
}

/// Blanket impl: any `FnMut(&mut Level, &mut Frame)` is a `System`.
impl<F: FnMut(&mut Level, &mut Frame<'_>)> System for F {
    fn run(&mut self, level: &mut Level, frame: &mut Frame<'_>) {
        (self)(level, frame);
    }
}

/// A boxed [`System`] with a short name for diagnostics.
struct NamedSystem {
    #[cfg(any(feature = "diagnostics", test))]
    name: String,
    system: Box<dyn System>,
}

/// Per-system timing recorded during a single tick.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// An ordered list of systems to run.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    /// Per-system timings from the most recent `run()` call.
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(NamedSystem {
            #[cfg(any(feature = "diagnostics", test))]
            name: short_system_name(std::any::type_name::<S>()),
            system: Box::new(system),
        });
    }

    /// Builder form of [`add_system`](Self::add_system).
    pub fn with_system<S: System + 'static>(mut self, system: S) -> Self {
        self.add_system(system);
        self
    }

    /// Run all systems in order on the given level.
    pub fn run(&mut self, level: &mut Level, frame: &mut Frame<'_>) {
        #[cfg(feature = "diagnostics")]
        {
            self.timings.clear();
            for ns in &mut self.systems {
                let start = std::time::Instant::now();
                ns.system.run(level, frame);
                let elapsed = start.elapsed();
                self.timings.push(SystemTiming {
                    name: ns.name.clone(),
                    duration_us: elapsed.as_secs_f64() * 1_000_000.0,
                });
            }
        }
        #[cfg(not(feature = "diagnostics"))]
        {
            for ns in &mut self.systems {
                ns.system.run(level, frame);
            }
        }
    }

    /// Timings from the most recent [`run`](Self::run), in schedule order.
    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    /// Returns the number of systems in this schedule.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `skald::systems::MovementSystem` →
/// `MovementSystem`, `{{closure}}` → `<closure>`).
#[cfg(any(feature = "diagnostics", test))]
fn short_system_name(full: &str) -> String {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}
