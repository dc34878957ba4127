use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValuationError;

/// Separator used in the string form of a [`ComponentKey`].
///
/// Datasets are rejected at load time when a segment id or component name
/// contains it, so the string form always splits back into the same pair.
pub const KEY_SEPARATOR: &str = "::";

/// Identifies one component across a company's full component set.
///
/// Serialized as `"{segment_id}::{component}"` so it can be used as a JSON
/// object key in override maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentKey {
    segment_id: String,
    component: String,
}

impl ComponentKey {
    pub fn new(segment_id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            component: component.into(),
        }
    }

    pub fn segment_id(&self) -> &str {
        &self.segment_id
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.segment_id, KEY_SEPARATOR, self.component)
    }
}

impl FromStr for ComponentKey {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(KEY_SEPARATOR) {
            Some((segment_id, component))
                if !segment_id.is_empty()
                    && !component.is_empty()
                    && !component.contains(KEY_SEPARATOR) =>
            {
                Ok(Self::new(segment_id, component))
            }
            _ => Err(ValuationError::InvalidKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for ComponentKey {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentKey> for String {
    fn from(key: ComponentKey) -> Self {
        key.to_string()
    }
}

/// User growth-rate overrides keyed by component.
///
/// Owned by the caller and passed into the engine by reference on every
/// recalculation; the engine never mutates or keeps it. Iterates in key
/// order (segment id, then component name).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateOverrides {
    rates: BTreeMap<ComponentKey, f64>,
}

impl RateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ComponentKey) -> Option<f64> {
        self.rates.get(key).copied()
    }

    pub fn insert(&mut self, key: ComponentKey, rate: f64) -> Option<f64> {
        self.rates.insert(key, rate)
    }

    pub fn remove(&mut self, key: &ComponentKey) -> Option<f64> {
        self.rates.remove(key)
    }

    pub fn clear(&mut self) {
        self.rates.clear();
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentKey, f64)> {
        self.rates.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(ComponentKey, f64)> for RateOverrides {
    fn from_iter<I: IntoIterator<Item = (ComponentKey, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}
