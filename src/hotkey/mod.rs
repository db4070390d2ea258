use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

mod combo;
pub mod global;

pub use combo::Combo;

/// Identifier the OS facility reports back when a binding fires.
pub type BindingId = u32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("invalid hotkey combination '{0}'")]
    InvalidCombo(String),
    #[error("hotkey '{0}' is already registered")]
    AlreadyBound(String),
    #[error("os rejected hotkey '{combo}': {reason}")]
    OsRejected { combo: String, reason: String },
}

/// OS-level global hotkey facility.
pub trait HotkeyBackend {
    fn bind(&mut self, combo: &Combo) -> Result<BindingId, HotkeyError>;
    fn unbind(&mut self, id: BindingId) -> Result<(), HotkeyError>;
}

/// Used when the OS facility could not be initialised; every bind is rejected.
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl HotkeyBackend for UnavailableBackend {
    fn bind(&mut self, combo: &Combo) -> Result<BindingId, HotkeyError> {
        Err(HotkeyError::OsRejected {
            combo: combo.to_string(),
            reason: self.reason.clone(),
        })
    }

    fn unbind(&mut self, _id: BindingId) -> Result<(), HotkeyError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Idle,
    Active(usize),
}

struct Binding<A> {
    combo: Combo,
    action: A,
}

/// Maps combos to actions and keeps the OS bindings in sync.
///
/// Mutation needs `&mut self`; the owner is responsible for running
/// `rebind` to completion before anything else touches the registry.
pub struct HotkeyRegistry<A> {
    backend: Box<dyn HotkeyBackend>,
    bindings: HashMap<BindingId, Binding<A>>,
}

impl<A: Clone> HotkeyRegistry<A> {
    pub fn new(backend: Box<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            bindings: HashMap::new(),
        }
    }

    pub fn state(&self) -> RegistryState {
        match self.bindings.len() {
            0 => RegistryState::Idle,
            n => RegistryState::Active(n),
        }
    }

    pub fn register(&mut self, combo: &str, action: A) -> Result<BindingId, HotkeyError> {
        let combo: Combo = combo.parse()?;
        if self.bindings.values().any(|binding| binding.combo == combo) {
            return Err(HotkeyError::AlreadyBound(combo.to_string()));
        }

        let id = self.backend.bind(&combo)?;
        info!("registered hotkey {combo}");
        self.bindings.insert(id, Binding { combo, action });
        Ok(id)
    }

    /// Removes every binding. Failures are logged, never returned.
    pub fn unregister_all(&mut self) {
        for (id, binding) in self.bindings.drain() {
            if let Err(err) = self.backend.unbind(id) {
                debug!("non-fatal error unregistering {}: {err}", binding.combo);
            }
        }
        debug!("all hotkeys unregistered");
    }

    /// `unregister_all` followed by one `register` per entry. Individual
    /// failures leave that binding absent and are returned for reporting.
    pub fn rebind<I>(&mut self, entries: I) -> Vec<HotkeyError>
    where
        I: IntoIterator<Item = (String, A)>,
    {
        self.unregister_all();
        let mut failures = Vec::new();
        for (combo, action) in entries {
            if let Err(err) = self.register(&combo, action) {
                warn!("failed to register hotkey: {err}");
                failures.push(err);
            }
        }
        failures
    }

    /// Action for a binding the OS reported as pressed, if still bound.
    pub fn dispatch(&self, id: BindingId) -> Option<A> {
        match self.bindings.get(&id) {
            Some(binding) => {
                debug!("hotkey {} fired", binding.combo);
                Some(binding.action.clone())
            }
            None => {
                debug!("ignoring event for stale hotkey binding {id}");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::{BindingId, Combo, HotkeyBackend, HotkeyError};

    /// Records OS-level bindings; `rejected` keys fail to bind.
    #[derive(Default, Clone)]
    pub struct FakeBackend {
        pub bound: Arc<Mutex<HashMap<BindingId, String>>>,
        pub rejected: Arc<Mutex<Vec<String>>>,
        next_id: Arc<Mutex<BindingId>>,
    }

    impl FakeBackend {
        pub fn id_for(&self, combo: &str) -> Option<BindingId> {
            self.bound
                .lock()
                .expect("fake backend")
                .iter()
                .find(|(_, bound)| bound.as_str() == combo)
                .map(|(id, _)| *id)
        }

        pub fn bound_combos(&self) -> Vec<String> {
            let mut combos: Vec<String> =
                self.bound.lock().expect("fake backend").values().cloned().collect();
            combos.sort();
            combos
        }
    }

    impl HotkeyBackend for FakeBackend {
        fn bind(&mut self, combo: &Combo) -> Result<BindingId, HotkeyError> {
            let name = combo.to_string();
            if self.rejected.lock().expect("fake backend").contains(&name) {
                return Err(HotkeyError::OsRejected {
                    combo: name,
                    reason: "taken by another application".to_string(),
                });
            }
            let mut next = self.next_id.lock().expect("fake backend");
            *next += 1;
            self.bound.lock().expect("fake backend").insert(*next, name);
            Ok(*next)
        }

        fn unbind(&mut self, id: BindingId) -> Result<(), HotkeyError> {
            self.bound.lock().expect("fake backend").remove(&id);
            Ok(())
        }
    }
}
