//! Debounce timers keyed by purpose.
//!
//! Each purpose has at most one live deadline. Starting a timer again
//! replaces the old deadline, so a superseded timer can never fire.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::constants::{
    CLICK_SETTLE, FOCUS_INTENT, LINK_DOUBLE_CLICK_RESET, LINK_SINGLE_CLICK, SELECTION_SETTLE,
    SELECT_ALL_GUARD, TYPING_QUIET,
};

/// Purposes of the panel controller's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PanelTimer {
    SelectionSettle,
    ClickSettle,
    SelectAllGuard,
    TypingQuiet,
    FocusIntent,
}

impl PanelTimer {
    pub fn delay(&self) -> Duration {
        match self {
            PanelTimer::SelectionSettle => SELECTION_SETTLE,
            PanelTimer::ClickSettle => CLICK_SETTLE,
            PanelTimer::SelectAllGuard => SELECT_ALL_GUARD,
            PanelTimer::TypingQuiet => TYPING_QUIET,
            PanelTimer::FocusIntent => FOCUS_INTENT,
        }
    }
}

/// Purposes of the link tap arbiter's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TapTimer {
    SingleClick,
    DoubleClickReset,
}

impl TapTimer {
    pub fn delay(&self) -> Duration {
        match self {
            TapTimer::SingleClick => LINK_SINGLE_CLICK,
            TapTimer::DoubleClickReset => LINK_DOUBLE_CLICK_RESET,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerTable<K: Ord + Copy> {
    deadlines: BTreeMap<K, Instant>,
}

impl<K: Ord + Copy> Default for TimerTable<K> {
    fn default() -> Self {
        Self {
            deadlines: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> TimerTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire `delay` after `now`, replacing any live deadline.
    pub fn start(&mut self, kind: K, now: Instant, delay: Duration) {
        self.deadlines.insert(kind, now + delay);
    }

    /// Returns whether a live timer was cancelled.
    pub fn cancel(&mut self, kind: K) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.deadlines.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return the earliest timer due at `now`, if any.
    pub fn pop_due(&mut self, now: Instant) -> Option<K> {
        let (kind, _) = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .min_by_key(|(_, at)| **at)
            .map(|(k, at)| (*k, *at))?;
        self.deadlines.remove(&kind);
        Some(kind)
    }
}
