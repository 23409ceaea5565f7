//! Priority-ordered fault effect tables.
//!
//! An overridable operation of a component owns an [`EffectTable`]. At call
//! time the table is consulted with the faults active in the current step:
//! the highest-priority effect whose fault is active replaces the nominal
//! result, otherwise the nominal result is returned unchanged.

use crate::fault::FaultId;
use crate::fault_set::FaultSet;
use std::fmt;

/// Override function: receives the operation context and the nominal result.
pub type Override<C, T> = fn(&C, T) -> T;

/// A single fault effect entry.
pub struct Effect<C, T> {
    /// Fault that enables this effect.
    pub fault: FaultId,
    /// Higher priorities win when several effects are enabled.
    pub priority: u8,
    /// Replacement behaviour.
    pub apply: Override<C, T>,
}

impl<C, T> Clone for Effect<C, T> {
    fn clone(&self) -> Self {
        Self {
            fault: self.fault,
            priority: self.priority,
            apply: self.apply,
        }
    }
}

impl<C, T> fmt::Debug for Effect<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("fault", &self.fault)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Effects of one overridable operation, sorted by descending priority.
pub struct EffectTable<C, T> {
    effects: Vec<Effect<C, T>>,
}

impl<C, T> Default for EffectTable<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, T> Clone for EffectTable<C, T> {
    fn clone(&self) -> Self {
        Self {
            effects: self.effects.clone(),
        }
    }
}

impl<C, T> fmt::Debug for EffectTable<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.effects).finish()
    }
}

impl<C, T> EffectTable<C, T> {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Adds an effect. Entries of equal priority keep insertion order.
    #[must_use]
    pub fn with(mut self, fault: FaultId, priority: u8, apply: Override<C, T>) -> Self {
        self.effects.push(Effect {
            fault,
            priority,
            apply,
        });
        self.effects.sort_by(|a, b| b.priority.cmp(&a.priority));
        self
    }

    /// Returns the effect that would apply for the given active faults.
    #[must_use]
    pub fn selected(&self, active: &FaultSet) -> Option<&Effect<C, T>> {
        self.effects.iter().find(|e| active.contains(e.fault))
    }

    /// Runs the operation: applies the selected effect to the nominal result.
    pub fn resolve(&self, active: &FaultSet, context: &C, nominal: T) -> T {
        match self.selected(active) {
            Some(effect) => (effect.apply)(context, nominal),
            None => nominal,
        }
    }

    /// Returns the number of registered effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns true if no effect is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUCK: FaultId = FaultId::new(0);
    const NOISY: FaultId = FaultId::new(1);

    fn table() -> EffectTable<u32, u32> {
        EffectTable::new()
            .with(NOISY, 1, |_, nominal| nominal + 1)
            .with(STUCK, 5, |_, _| 0)
    }

    #[test]
    fn nominal_when_nothing_active() {
        assert_eq!(table().resolve(&FaultSet::empty(), &7, 7), 7);
    }

    #[test]
    fn highest_priority_wins() {
        let both: FaultSet = [STUCK, NOISY].into_iter().collect();
        assert_eq!(table().resolve(&both, &7, 7), 0);
        assert_eq!(table().resolve(&FaultSet::singleton(NOISY), &7, 7), 8);
    }

    #[test]
    fn selected_reports_fault() {
        let t = table();
        let effect = t.selected(&FaultSet::singleton(STUCK)).unwrap();
        assert_eq!(effect.fault, STUCK);
        assert_eq!(t.len(), 2);
    }
}
