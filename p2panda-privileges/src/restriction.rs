// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed restriction values and restriction sets keyed by restriction name.
use std::collections::BTreeMap;
use std::collections::btree_map::Values;
use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RestrictionError {
    #[error("restriction {0} is not defined for this scope")]
    UnknownRestriction(String),

    #[error("value {value:?} of restriction {name} is not a valid {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: ValueType,
    },

    #[error("restriction {0} accepts exactly one value, {1} were given")]
    SingleValue(String, usize),
}

/// Type tag of a restriction value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ValueType {
    String,
    Name,
    Path,
    Long,
    Double,
    Boolean,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueType::String => "string",
            ValueType::Name => "name",
            ValueType::Path => "path",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::Boolean => "boolean",
        };

        write!(f, "{}", s)
    }
}

/// A single scalar restriction value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
pub enum RestrictionValue {
    String(String),
    Name(String),
    Path(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
}

impl RestrictionValue {
    /// Parse a raw value into a typed restriction value.
    ///
    /// Returns `None` if the raw value can not be represented as the requested type.
    pub fn parse(value_type: ValueType, raw: &str) -> Option<Self> {
        match value_type {
            ValueType::String => Some(RestrictionValue::String(raw.to_owned())),
            ValueType::Name if !raw.is_empty() => Some(RestrictionValue::Name(raw.to_owned())),
            ValueType::Name => None,
            ValueType::Path if raw.starts_with('/') => {
                Some(RestrictionValue::Path(raw.to_owned()))
            }
            ValueType::Path => None,
            ValueType::Long => raw.parse().ok().map(RestrictionValue::Long),
            ValueType::Double => raw.parse().ok().map(RestrictionValue::Double),
            ValueType::Boolean => raw.parse().ok().map(RestrictionValue::Boolean),
        }
    }

    /// Type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            RestrictionValue::String(_) => ValueType::String,
            RestrictionValue::Name(_) => ValueType::Name,
            RestrictionValue::Path(_) => ValueType::Path,
            RestrictionValue::Long(_) => ValueType::Long,
            RestrictionValue::Double(_) => ValueType::Double,
            RestrictionValue::Boolean(_) => ValueType::Boolean,
        }
    }
}

impl Display for RestrictionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestrictionValue::String(value)
            | RestrictionValue::Name(value)
            | RestrictionValue::Path(value) => write!(f, "{}", value),
            RestrictionValue::Long(value) => write!(f, "{}", value),
            RestrictionValue::Double(value) => write!(f, "{}", value),
            RestrictionValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

/// Definition of a restriction as supplied by the restriction definition provider.
///
/// Whether a restriction holds one or many values is fixed by its definition, not by the data
/// attached to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestrictionDefinition {
    name: String,
    value_type: ValueType,
    multi_value: bool,
}

impl RestrictionDefinition {
    pub fn new(name: &str, value_type: ValueType, multi_value: bool) -> Self {
        Self {
            name: name.to_owned(),
            value_type,
            multi_value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_multi_value(&self) -> bool {
        self.multi_value
    }

    /// Parse raw values into a restriction of this definition.
    pub fn parse(&self, raw_values: &[&str]) -> Result<Restriction, RestrictionError> {
        if !self.multi_value && raw_values.len() != 1 {
            return Err(RestrictionError::SingleValue(self.name.clone(), raw_values.len()));
        }

        let values = raw_values
            .iter()
            .map(|raw| {
                RestrictionValue::parse(self.value_type, raw).ok_or_else(|| {
                    RestrictionError::InvalidValue {
                        name: self.name.clone(),
                        value: (*raw).to_owned(),
                        expected: self.value_type,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Restriction::new(self.clone(), values))
    }
}

/// A named qualifier attached to an allow or deny decision.
///
/// Equality compares values positionally: the same values inserted in a different order are not
/// equal.
#[derive(Clone, Debug, PartialEq)]
pub struct Restriction {
    definition: RestrictionDefinition,
    values: Vec<RestrictionValue>,
}

impl Restriction {
    pub fn new(definition: RestrictionDefinition, values: Vec<RestrictionValue>) -> Self {
        Self { definition, values }
    }

    /// Restriction holding exactly one value.
    pub fn single(definition: RestrictionDefinition, value: RestrictionValue) -> Self {
        Self::new(definition, vec![value])
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &RestrictionDefinition {
        &self.definition
    }

    pub fn is_multi_value(&self) -> bool {
        self.definition.is_multi_value()
    }

    pub fn values(&self) -> &[RestrictionValue] {
        &self.values
    }

    /// First value of this restriction, the only one for single-valued restrictions.
    pub fn value(&self) -> Option<&RestrictionValue> {
        self.values.first()
    }

    /// Union of both value sequences, existing values first and duplicates dropped.
    fn union(&self, incoming: &Restriction) -> Restriction {
        let mut values = self.values.clone();
        for value in &incoming.values {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }

        Restriction::new(self.definition.clone(), values)
    }
}

/// Restrictions of one decision bucket, at most one per name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RestrictionSet {
    restrictions: BTreeMap<String, Restriction>,
}

impl RestrictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Restriction> {
        self.restrictions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.restrictions.contains_key(name)
    }

    pub fn iter(&self) -> Values<'_, String, Restriction> {
        self.restrictions.values()
    }

    /// Insert a restriction, replacing any existing one with the same name.
    pub fn insert(&mut self, restriction: Restriction) -> Option<Restriction> {
        self.restrictions.insert(restriction.name().to_owned(), restriction)
    }

    /// Merge a single restriction into this set.
    ///
    /// Multi-valued restrictions are combined with an existing restriction of the same name,
    /// keeping the existing values first. Single-valued restrictions replace the existing one.
    pub fn merge_restriction(&mut self, restriction: &Restriction) {
        let merged = match self.restrictions.get(restriction.name()) {
            Some(existing) if restriction.is_multi_value() => existing.union(restriction),
            _ => restriction.clone(),
        };
        self.insert(merged);
    }

    /// Merge all restrictions of another set into this one.
    pub fn merge(&mut self, incoming: &RestrictionSet) {
        for restriction in incoming.iter() {
            self.merge_restriction(restriction);
        }
    }

    /// Remove restrictions by name, regardless of them being single- or multi-valued.
    pub fn unset<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.restrictions.remove(name);
        }
    }

    pub fn clear(&mut self) {
        self.restrictions.clear();
    }
}

impl FromIterator<Restriction> for RestrictionSet {
    fn from_iter<T: IntoIterator<Item = Restriction>>(iter: T) -> Self {
        let mut set = RestrictionSet::new();
        for restriction in iter {
            set.merge_restriction(&restriction);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RestrictionSet {
    type Item = &'a Restriction;
    type IntoIter = Values<'a, String, Restriction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
