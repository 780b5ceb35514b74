//! # Switches
//!
//! Named on/off gates in front of handlers, producers and consumers.
//!
//! A `Switch` is a cheap handle onto shared state: clones observe and
//! mutate the same status, and two switches are equal only when they are
//! handles of the same state. The id is a label. `SwitchBoard` hands out
//! exactly one switch per id, so components built from one board are
//! controlled together by name.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Status of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchStatus {
    On,
    Off,
}

impl SwitchStatus {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    fn from_flag(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct SwitchState {
    id: String,
    on: AtomicBool,
}

/// Shared on/off gate identified by a stable id.
#[derive(Clone)]
pub struct Switch {
    inner: Arc<SwitchState>,
}

impl Switch {
    /// Create a switch that starts ON.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_status(id, SwitchStatus::On)
    }

    /// Create a switch with an explicit initial status.
    #[must_use]
    pub fn with_status(id: impl Into<String>, status: SwitchStatus) -> Self {
        Self {
            inner: Arc::new(SwitchState {
                id: id.into(),
                on: AtomicBool::new(status.is_on()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn status(&self) -> SwitchStatus {
        SwitchStatus::from_flag(self.inner.on.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.status().is_on()
    }

    pub fn turn_on(&self) {
        self.set_status(SwitchStatus::On);
    }

    pub fn turn_off(&self) {
        self.set_status(SwitchStatus::Off);
    }

    /// Set the status and return the previous one.
    pub fn set_status(&self, status: SwitchStatus) -> SwitchStatus {
        let previous = SwitchStatus::from_flag(self.inner.on.swap(status.is_on(), Ordering::AcqRel));
        if previous != status {
            debug!(switch = %self.inner.id, from = %previous, to = %status, "Switch toggled");
        }
        previous
    }
}

impl PartialEq for Switch {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Switch {}

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .finish()
    }
}

/// Registry handing out one shared switch per id.
#[derive(Default)]
pub struct SwitchBoard {
    switches: RwLock<BTreeMap<String, Switch>>,
}

impl SwitchBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the switch registered under `id`, creating it ON if absent.
    pub fn switch(&self, id: &str) -> Switch {
        if let Some(existing) = self.switches.read().get(id) {
            return existing.clone();
        }
        self.switches
            .write()
            .entry(id.to_string())
            .or_insert_with(|| Switch::new(id))
            .clone()
    }

    /// Look up a switch without creating it.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Switch> {
        self.switches.read().get(id).cloned()
    }

    /// Turn on the switch with `id`. Returns false when no such switch exists.
    pub fn turn_on(&self, id: &str) -> bool {
        self.get(id).map(|s| s.turn_on()).is_some()
    }

    /// Turn off the switch with `id`. Returns false when no such switch exists.
    pub fn turn_off(&self, id: &str) -> bool {
        self.get(id).map(|s| s.turn_off()).is_some()
    }

    /// Snapshot of every registered switch, ordered by id.
    #[must_use]
    pub fn statuses(&self) -> Vec<(String, SwitchStatus)> {
        self.switches
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.status()))
            .collect()
    }
}
