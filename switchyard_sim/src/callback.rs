// Completion callback registry.
//
// Feature modules register named post-execution hooks at startup ("after a
// road is built, play the construction sound"). Registration happens on a
// `CallbackRegistryBuilder`; `build()` freezes it into an immutable
// `CallbackRegistry` that the dispatcher owns for the rest of the session.
//
// Requests refer to callbacks by `CallbackId`, a small index into the frozen
// table. Ids are assigned in registration order, so every peer that registers
// the same feature set gets the same ids. Ids never cross the wire: a pending
// request remembers its callback locally and the callback fires on the
// originating peer only.

use crate::command::CommandEnvelope;
use crate::cost::CommandCost;
use std::collections::BTreeMap;
use thiserror::Error;

/// A completion hook. Invoked exactly once per request with the final
/// result and the original envelope.
pub type CommandCallback = Box<dyn Fn(&CommandCost, &CommandEnvelope) + Send + Sync>;

/// Handle to a registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u16);

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback {0:?} is already registered")]
    Duplicate(&'static str),
    #[error("callback table is full")]
    TableFull,
}

/// Collects callbacks during startup.
#[derive(Default)]
pub struct CallbackRegistryBuilder {
    entries: Vec<(&'static str, CommandCallback)>,
}

impl CallbackRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `name`. Names must be unique.
    pub fn register<F>(
        &mut self,
        name: &'static str,
        callback: F,
    ) -> Result<CallbackId, CallbackError>
    where
        F: Fn(&CommandCost, &CommandEnvelope) + Send + Sync + 'static,
    {
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(CallbackError::Duplicate(name));
        }
        let id = u16::try_from(self.entries.len()).map_err(|_| CallbackError::TableFull)?;
        self.entries.push((name, Box::new(callback)));
        Ok(CallbackId(id))
    }

    pub fn build(self) -> CallbackRegistry {
        let by_name = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (*name, CallbackId(i as u16)))
            .collect();
        log::debug!(
            target: "switchyard::callback",
            "{} completion callbacks registered",
            self.entries.len()
        );
        CallbackRegistry {
            entries: self.entries,
            by_name,
        }
    }
}

/// The frozen callback table.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Vec<(&'static str, CommandCallback)>,
    by_name: BTreeMap<&'static str, CallbackId>,
}

impl CallbackRegistry {
    pub fn id_of(&self, name: &str) -> Option<CallbackId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: CallbackId) -> Option<&'static str> {
        self.entries.get(usize::from(id.0)).map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke callback `id`. Returns `false` if no such callback exists.
    pub fn invoke(&self, id: CallbackId, result: &CommandCost, env: &CommandEnvelope) -> bool {
        match self.entries.get(usize::from(id.0)) {
            Some((_, callback)) => {
                callback(result, env);
                true
            }
            None => {
                log::warn!(target: "switchyard::callback", "unknown callback id {}", id.0);
                false
            }
        }
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}
