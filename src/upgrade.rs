//! Upgrade task queue serviced while a runner sits in the hangar.
//!
//! A recalled runner's haul is converted into tasks: one DAMAGE task for
//! collected currency and one RELIC task per fragment type. Tasks drain at
//! `1 + floor(total * 0.01)` units per second, so bigger hauls finish
//! proportionally faster and worst-case wait time stays bounded. The queue
//! keeps an explicit current-task slot in front of a FIFO of pending tasks.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

use crate::constants::UPGRADE_RATE_FACTOR;
use crate::relics::RelicType;

/// What a task pays into when it drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "relic")]
pub enum UpgradeKind {
    /// Adds directly to the runner's base damage rate.
    Damage,
    /// Deposits into the fragment bank for one relic type.
    Relic(RelicType),
}

/// A single queued upgrade with drain bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeTask {
    #[serde(flatten)]
    pub kind: UpgradeKind,
    pub total: f64,
    pub remaining: f64,
    pub rate: f64,
}

impl UpgradeTask {
    #[must_use]
    pub fn new(kind: UpgradeKind, total: f64) -> Self {
        Self {
            kind,
            total,
            remaining: total,
            rate: 1.0 + (total * UPGRADE_RATE_FACTOR).floor(),
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// Portion of a task drained during one tick.
pub type DrainedAmounts = SmallVec<[(UpgradeKind, f64); 2]>;

/// FIFO of upgrade tasks with an explicit current slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeQueue {
    #[serde(default)]
    pub current: Option<UpgradeTask>,
    #[serde(default)]
    pub pending: VecDeque<UpgradeTask>,
}

impl UpgradeQueue {
    pub fn push(&mut self, task: UpgradeTask) {
        if task.total <= 0.0 {
            return;
        }
        if self.current.is_none() {
            self.current = Some(task);
        } else {
            self.pending.push_back(task);
        }
    }

    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.current.is_some()) + self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_drained()
    }

    /// Drain the current task by `min(remaining, rate * dt)`. Only the
    /// current task is serviced within a tick; a task finishing mid-tick
    /// promotes its successor without consuming from it.
    pub fn advance(&mut self, dt: f64) -> DrainedAmounts {
        let mut drained = DrainedAmounts::new();
        if self.current.is_none() {
            self.current = self.pending.pop_front();
        }
        if let Some(task) = self.current.as_mut() {
            let consumed = task.remaining.min(task.rate * dt);
            if consumed > 0.0 {
                task.remaining -= consumed;
                drained.push((task.kind, consumed));
            }
            if task.is_done() {
                self.current = self.pending.pop_front();
            }
        }
        drained
    }
}
