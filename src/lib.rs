//! Zone Runners Engine
//!
//! Platform-agnostic core progression logic for the Zone Runners idle game.
//! This crate provides the tick-based simulation without UI or
//! platform-specific dependencies: rendering and persistence backends plug
//! in behind traits.

pub mod constants;
pub mod construction;
pub mod engine;
pub mod ledger;
pub mod map;
pub mod relics;
pub mod rng;
pub mod runner;
pub mod state;
pub mod upgrade;
pub mod view;

// Re-export commonly used types
pub use construction::{ConstructionBoard, MappedOutcome, ZonePhase};
pub use engine::combat::{
    BarrierKind, barrier_kind, compute_barrier_health, waves_for_level,
};
pub use engine::{TickOutcome, squad_level_threshold, tick};
pub use ledger::{DiscoveryRoll, EconomyLedger};
pub use map::{
    Cell, EnvironmentTheme, MAP_PATTERNS, MapSegment, PatternError, validate_patterns,
};
pub use relics::{FragmentBank, RelicTiers, RelicType, settle_tier_ups, upgrade_cost};
pub use rng::{CountingRng, RngBundle};
pub use runner::{AgentKind, CombatContext, Runner, RunnerId, RunnerState, StatSnapshot};
pub use state::EngineState;
pub use upgrade::{UpgradeKind, UpgradeQueue, UpgradeTask};
pub use view::{RunnerMarker, TrackerEntry, ZoneStatus, runner_markers, tracker, zone_statuses};

/// Trait for abstracting save/load operations.
/// Platform-specific implementations should provide this.
pub trait EngineStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist the serialized engine state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, raw: &str) -> Result<(), Self::Error>;

    /// Load the serialized engine state, or `None` when no save exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> Result<Option<String>, Self::Error>;

    /// Delete any persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete(&self) -> Result<(), Self::Error>;
}

/// Facade owning the engine state and its storage backend.
pub struct Engine<S: EngineStorage> {
    state: EngineState,
    storage: S,
}

impl<S: EngineStorage> Engine<S> {
    /// Fresh engine over the given storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            state: EngineState::new(),
            storage,
        }
    }

    /// Load persisted state, falling back to a fresh start. A corrupt save
    /// is logged and treated as no save at all; it is never fatal.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backing store itself cannot be read.
    pub fn load_or_default(storage: S) -> Result<Self, S::Error> {
        let state = match storage.load()? {
            Some(raw) => match serde_json::from_str::<EngineState>(&raw) {
                Ok(mut state) => {
                    state.rehydrate();
                    state
                }
                Err(err) => {
                    log::warn!("discarding corrupt save: {err}");
                    let mut fresh = EngineState::new();
                    fresh.push_log(constants::LOG_SAVE_CORRUPT);
                    fresh
                }
            },
            None => EngineState::new(),
        };
        Ok(Self { state, storage })
    }

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, rng: &RngBundle, dt: f64) -> TickOutcome {
        engine::tick(&mut self.state, rng, dt)
    }

    /// Persist the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub fn save(&self) -> Result<(), anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let raw = serde_json::to_string(&self.state)?;
        self.storage.save(&raw).map_err(Into::into)
    }

    /// Wipe both in-memory and persisted progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted save cannot be deleted.
    pub fn reset(&mut self) -> Result<(), S::Error> {
        self.state = EngineState::new();
        self.storage.delete()
    }
}
