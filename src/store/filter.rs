use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::id::Id;

/// Predicate over a document. Paths are dotted (`createdBy.id`).
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Documents whose id-derived creation time is at or after the instant.
    CreatedSince(OffsetDateTime),
    And(Vec<Filter>),
}

impl Filter {
    pub fn id(id: &Id) -> Self {
        Self::Eq("id".to_owned(), Value::String(id.to_string()))
    }

    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Self::Eq(path.to_owned(), value.into())
    }

    pub fn is_in(path: &str, values: impl IntoIterator<Item = Value>) -> Self {
        Self::In(path.to_owned(), values.into_iter().collect())
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq(path, value) => lookup(document, path) == Some(value),
            Self::In(path, values) => lookup(document, path).is_some_and(|v| values.contains(v)),
            Self::CreatedSince(since) => lookup(document, "id")
                .and_then(Value::as_str)
                .and_then(|id| id.parse::<Id>().ok())
                .is_some_and(|id| id.created_at() >= *since),
            Self::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

/// Update applied to a single document.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Set { path: String, value: Value },
    Push { path: String, value: Value },
    /// Appends `value` unless an element with the same `key` sub-path already exists.
    AddToSet { path: String, value: Value, key: String },
    /// Removes every array element matching the filter.
    Pull { path: String, matching: Filter },
    /// Applies `mutation` to every element of the array at `path` matching the filter.
    Each {
        path: String,
        matching: Filter,
        mutation: Box<Mutation>,
    },
}

impl Mutation {
    pub fn set(path: &str, value: impl Into<Value>) -> Self {
        Self::Set { path: path.to_owned(), value: value.into() }
    }

    pub fn push(path: &str, value: impl Into<Value>) -> Self {
        Self::Push { path: path.to_owned(), value: value.into() }
    }

    pub fn add_to_set(path: &str, value: impl Into<Value>, key: &str) -> Self {
        Self::AddToSet {
            path: path.to_owned(),
            value: value.into(),
            key: key.to_owned(),
        }
    }

    pub fn pull(path: &str, matching: Filter) -> Self {
        Self::Pull { path: path.to_owned(), matching }
    }

    pub fn each(path: &str, matching: Filter, mutation: Mutation) -> Self {
        Self::Each {
            path: path.to_owned(),
            matching,
            mutation: Box::new(mutation),
        }
    }

    /// Returns whether the document changed.
    pub(crate) fn apply(&self, document: &mut Value) -> bool {
        match self {
            Self::Set { path, value } => {
                let Some(slot) = slot(document, path) else {
                    return false;
                };
                if slot == value {
                    return false;
                }
                *slot = value.clone();
                true
            }
            Self::Push { path, value } => match array(document, path) {
                Some(items) => {
                    items.push(value.clone());
                    true
                }
                None => false,
            },
            Self::AddToSet { path, value, key } => {
                let Some(items) = array(document, path) else {
                    return false;
                };
                let identity = lookup(value, key);
                let exists = items.iter().any(|item| match identity {
                    Some(identity) => lookup(item, key) == Some(identity),
                    None => item == value,
                });
                if exists {
                    return false;
                }
                items.push(value.clone());
                true
            }
            Self::Pull { path, matching } => {
                let Some(items) = existing_array(document, path) else {
                    return false;
                };
                let before = items.len();
                items.retain(|item| !matching.matches(item));
                items.len() != before
            }
            Self::Each { path, matching, mutation } => {
                let Some(items) = existing_array(document, path) else {
                    return false;
                };
                items
                    .iter_mut()
                    .filter(|item| matching.matches(item))
                    .fold(false, |changed, item| mutation.apply(item) || changed)
            }
        }
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, key| current.get(key))
}

/// Mutable slot at `path`, creating intermediate objects as needed.
fn slot<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = document;
    for key in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = current.as_object_mut()?.entry(key).or_insert(Value::Null);
    }
    Some(current)
}

fn array<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Vec<Value>> {
    let slot = slot(document, path)?;
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
}

fn existing_array<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Vec<Value>> {
    path.split('.')
        .try_fold(document, |current, key| current.get_mut(key))?
        .as_array_mut()
}
