use std::collections::BTreeMap;

use dl_core::Value;

/// Host-owned variable store consulted by node bodies.
pub trait VariableStorage {
    fn get(&self, name: &str) -> Value;
    fn set(&mut self, name: &str, value: Value);
    fn clear(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryVariableStorage {
    values: BTreeMap<String, Value>,
}

impl MemoryVariableStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl VariableStorage for MemoryVariableStorage {
    fn get(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variables_read_as_null() {
        let storage = MemoryVariableStorage::new();
        assert_eq!(storage.get("$missing"), Value::Null);
    }

    #[test]
    fn set_overwrites_and_clear_resets() {
        let mut storage = MemoryVariableStorage::new();
        storage.set("$gold", Value::Number(1.0));
        storage.set("$gold", Value::Number(2.0));
        assert_eq!(storage.get("$gold"), Value::Number(2.0));
        assert_eq!(storage.values().len(), 1);
        storage.clear();
        assert_eq!(storage.get("$gold"), Value::Null);
    }
}
