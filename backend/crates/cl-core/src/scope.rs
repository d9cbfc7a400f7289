use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Connection-scope mapping handed to every application instance.
///
/// Plain values (`type`, `path`, `multiplexer_stream`, ...) are JSON. Opaque
/// entries populated by outer middleware (a session, a user) live in
/// `extensions`; the core forwards them untouched and never looks inside.
#[derive(Clone, Default)]
pub struct Scope {
    values: Map<String, Value>,
    extensions: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Scope {
    /// Scope for a WebSocket connection on `path`
    pub fn websocket(path: &str) -> Self {
        Self::default()
            .with_value("type", Value::from("websocket"))
            .with_value("path", Value::from(path))
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn insert_extension<T>(&mut self, key: &str, extension: T)
    where
        T: Any + Send + Sync,
    {
        self.extensions.insert(key.to_string(), Arc::new(extension));
    }

    /// Typed access to an opaque entry; `None` when missing or of another type.
    pub fn extension<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.extensions.get(key).cloned()?.downcast::<T>().ok()
    }

    pub fn has_extension(&self, key: &str) -> bool {
        self.extensions.contains_key(key)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extension_keys: Vec<&String> = self.extensions.keys().collect();
        extension_keys.sort();

        f.debug_struct("Scope")
            .field("values", &self.values)
            .field("extensions", &extension_keys)
            .finish()
    }
}
