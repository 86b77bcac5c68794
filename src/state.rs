//! Test state shared between scenarios
//!
//! A `TestState` is created empty at the start of a run and handed to each
//! scenario phase in turn. Scenarios use it to pass values forward: a login
//! scenario saves a token, later scenarios read it to authorize requests.
//! Writes overwrite; nothing expires; nothing is validated.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::common::{Error, Result};

/// Key/value store passed between sequential scenarios
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestState {
    values: Map<String, Value>,
}

impl TestState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Save `value` under `key`, replacing any previous value
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        tracing::trace!(%key, "state put");
        self.values.insert(key, value);
    }

    /// Save every entry
    pub fn put_all<K, I>(&mut self, entries: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    /// Current value of `key`, or `None` if it was never written
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The live store
    pub fn get_all(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The live store, mutably. Prefer `put`/`put_all` for writes.
    pub fn get_all_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.values
    }

    /// Remove every key
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of `key`, failing if it was never written
    pub fn require(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| Error::MissingStateKey(key.to_string()))
    }

    /// Value at a JSON pointer inside the value stored under `key`
    ///
    /// An empty pointer returns the stored value itself.
    pub fn lookup(&self, key: &str, pointer: &str) -> Result<&Value> {
        let root = self.require(key)?;
        if pointer.is_empty() {
            return Ok(root);
        }
        root.pointer(pointer)
            .ok_or_else(|| Error::missing_state_path(key, pointer))
    }

    /// Value at `pointer` inside `key`, rendered as a URL path segment
    ///
    /// Strings are used as-is and numbers in their JSON form; anything else is
    /// rejected since it cannot name a resource.
    pub fn segment(&self, key: &str, pointer: &str) -> Result<String> {
        match self.lookup(key, pointer)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(Error::StateType {
                key: key.to_string(),
                reason: format!("expected a string or number at '{}', found {}", pointer, other),
            }),
        }
    }

    /// Read a typed value
    pub fn get_typed<T: DeserializeOwned>(&self, key: &StateKey<T>) -> Result<T> {
        let value = self.require(key.name())?;
        serde_json::from_value(value.clone()).map_err(|e| Error::StateType {
            key: key.name().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write a typed value
    pub fn put_typed<T: Serialize>(&mut self, key: &StateKey<T>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.put(key.name(), value);
        Ok(())
    }
}

/// A state key bound to the type stored under it
///
/// ```
/// use restcheck::state::{StateKey, TestState};
///
/// const TOKEN: StateKey<String> = StateKey::new("userToken");
///
/// let mut state = TestState::new();
/// state.put_typed(&TOKEN, &"abc".to_string()).unwrap();
/// assert_eq!(state.get_typed(&TOKEN).unwrap(), "abc");
/// ```
pub struct StateKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey").field(&self.name).finish()
    }
}

impl<T> fmt::Display for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
