use super::Val;
use crate::lang::Error;
use indexmap::IndexMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Separator placed between the parts of a multi-key index `a[i, j]`.
pub const KEY_SEPARATOR: &str = "\x1c";

/// ## Sparse associative array
///
/// Keys are strings and iteration follows insertion order.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    map: IndexMap<Rc<str>, Val>,
}

impl Array {
    pub fn new() -> Array {
        Array::default()
    }

    /// Build the single lookup key for a list of index values.
    pub fn key(parts: &[Val]) -> Result<Rc<str>> {
        if parts.len() == 1 {
            return parts[0].to_str();
        }
        let mut key = String::new();
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                key.push_str(KEY_SEPARATOR);
            }
            key.push_str(&part.to_str()?);
        }
        Ok(key.into())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Val> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn insert(&mut self, key: Rc<str>, val: Val) {
        self.map.insert(key, val);
    }

    pub fn remove(&mut self, key: &str) -> Option<Val> {
        self.map.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.map.clear()
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.map.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Val)> {
        self.map.iter()
    }

    pub fn deep_copy(&self) -> Array {
        Array {
            map: self
                .map
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_copy()))
                .collect(),
        }
    }

    /// Keys of both; the right value wins for keys present in both.
    pub fn union(&self, rhs: &Array) -> Array {
        let mut map = IndexMap::with_capacity(self.len() + rhs.len());
        for (k, v) in self.map.iter() {
            let v = rhs.map.get(k).unwrap_or(v);
            map.insert(k.clone(), v.clone());
        }
        for (k, v) in rhs.map.iter() {
            if !map.contains_key(k) {
                map.insert(k.clone(), v.clone());
            }
        }
        Array { map }
    }

    /// Keys of the left that are missing from the right.
    pub fn difference(&self, rhs: &Array) -> Array {
        Array {
            map: self
                .map
                .iter()
                .filter(|(k, _)| !rhs.contains_key(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Keys present in both, with values taken from the right.
    pub fn intersection(&self, rhs: &Array) -> Array {
        Array {
            map: self
                .map
                .keys()
                .filter_map(|k| rhs.map.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
        }
    }

    /// Keys present in exactly one of the two.
    pub fn symmetric_difference(&self, rhs: &Array) -> Array {
        let mut result = self.difference(rhs);
        for (k, v) in rhs.map.iter() {
            if !self.contains_key(k) {
                result.insert(k.clone(), v.clone());
            }
        }
        result
    }

    pub fn is_subset_of(&self, rhs: &Array) -> bool {
        self.map.keys().all(|k| rhs.contains_key(k))
    }
}

impl std::fmt::Display for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{{")?;
        for (index, (k, v)) in self.map.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: ", k.replace(KEY_SEPARATOR, ","))?;
            match v {
                Val::String(s) => write!(f, "{:?}", s)?,
                _ => write!(f, "{}", v)?,
            }
        }
        write!(f, "}}")
    }
}
