//! Shared, mutable object and array storage.
//!
//! Objects and arrays have reference semantics: cloning an [`ObjectRef`]
//! clones the handle, not the properties. This is what lets a module hand out
//! its exports container before it has finished populating it.

use super::value::Value;
use crate::Error;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A handle to an object's property table. Properties keep insertion order.
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<IndexMap<String, Value>>>);

impl ObjectRef {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object from key/value pairs.
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        Self(Arc::new(RwLock::new(map)))
    }

    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Sets a property value, appending new keys at the end.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0.write().insert(key.into(), value);
    }

    /// Returns the property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Returns a snapshot of the properties in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Objects may contain themselves; never recurse here.
        write!(f, "ObjectRef({:p}, keys: {:?})", Arc::as_ptr(&self.0), self.keys())
    }
}

/// Longest array a script may build.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

fn invalid_length() -> Error {
    Error::RangeError("Invalid array length".to_string())
}

/// A handle to an array's elements.
#[derive(Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    /// Creates a new empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the element at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Sets the element at `index`, filling any gap with `undefined`.
    ///
    /// Fails with a `RangeError` if the array would grow past
    /// [`MAX_ARRAY_LENGTH`].
    pub fn set(&self, index: usize, value: Value) -> Result<(), Error> {
        let mut elements = self.0.write();
        if index >= elements.len() {
            if index >= MAX_ARRAY_LENGTH {
                return Err(invalid_length());
            }
            elements.resize(index + 1, Value::Undefined);
        }
        elements[index] = value;
        Ok(())
    }

    /// Appends an element and returns the new length.
    pub fn push(&self, value: Value) -> Result<usize, Error> {
        let mut elements = self.0.write();
        if elements.len() >= MAX_ARRAY_LENGTH {
            return Err(invalid_length());
        }
        elements.push(value);
        Ok(elements.len())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns true if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns a snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<Value>> for ArrayRef {
    fn from(elements: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(elements)))
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayRef({:p}, len: {})", Arc::as_ptr(&self.0), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_is_shared_between_clones() {
        let a = ObjectRef::new();
        let b = a.clone();
        b.set("x", Value::Number(1.0));
        assert_eq!(a.get("x"), Some(Value::Number(1.0)));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&ObjectRef::new()));
    }

    #[test]
    fn test_object_keeps_insertion_order() {
        let obj = ObjectRef::new();
        obj.set("b", Value::Null);
        obj.set("a", Value::Null);
        obj.set("b", Value::Boolean(true));
        assert_eq!(obj.keys(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_array_set_fills_gaps() {
        let arr = ArrayRef::new();
        arr.set(2, Value::Number(3.0)).unwrap();
        assert_eq!(arr.len(), 3);
        assert!(arr.get(0).unwrap().is_undefined());
        assert_eq!(arr.push(Value::Null).unwrap(), 4);
    }

    #[test]
    fn test_array_set_rejects_huge_index() {
        let arr = ArrayRef::from(vec![Value::Null]);
        assert!(matches!(
            arr.set(1_000_000_000_000_000, Value::Null),
            Err(Error::RangeError(msg)) if msg == "Invalid array length"
        ));
        assert!(arr.set(MAX_ARRAY_LENGTH, Value::Null).is_err());
        assert_eq!(arr.len(), 1);
        // Overwriting inside the array is always allowed.
        arr.set(0, Value::Boolean(true)).unwrap();
        assert_eq!(arr.get(0), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_self_referential_debug_terminates() {
        let obj = ObjectRef::new();
        obj.set("me", Value::Object(obj.clone()));
        assert!(format!("{:?}", obj).contains("me"));
    }
}
