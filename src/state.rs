// Explicit state holders for sampler output.
// Writes only happen on the worker task; the lock exists so handles can be shared across tasks.

use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct StateCell<T> {
    value: RwLock<T>,
}

impl<T: Clone> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    pub fn get(&self) -> T {
        match self.value.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, value: T) {
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());
        *guard = value;
    }

    /// Mutate in place and return whatever the closure computes.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}
