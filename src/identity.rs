//! Identity functions and the key naming convention.
//!
//! An identity function maps an entity to its [`KeyValue`]. Callers either
//! install one explicitly, or let the set derive one from the entity's
//! serialized shape: the first field named like the configured `Id` property,
//! else `<EntityName>Id`.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::KeyConvention;
use crate::error::{ConfigurationError, MockError, MockResult};
use crate::key::{KeyPart, KeyValue};

/// Serializes an entity so its fields can be inspected by name.
pub(crate) type ToJson<T> = fn(&T) -> Result<Value, serde_json::Error>;

pub(crate) fn to_json<T: Serialize>(entity: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(entity)
}

/// A shareable function returning an entity's key.
pub struct IdentityFn<T> {
    inner: Arc<dyn Fn(&T) -> MockResult<KeyValue> + Send + Sync>,
    /// Property the key was derived from, when produced by the convention.
    derived_from: Option<String>,
}

impl<T> IdentityFn<T> {
    /// Wraps a user-supplied key function.
    pub fn new<F, K>(f: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: Into<KeyValue>,
    {
        Self {
            inner: Arc::new(move |entity| Ok(f(entity).into())),
            derived_from: None,
        }
    }

    /// Computes the key of `entity`.
    pub fn key_of(&self, entity: &T) -> MockResult<KeyValue> {
        (self.inner)(entity)
    }

    /// Name of the property this function reads, if it was derived by convention.
    #[must_use]
    pub fn derived_from(&self) -> Option<&str> {
        self.derived_from.as_deref()
    }
}

impl<T> Clone for IdentityFn<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            derived_from: self.derived_from.clone(),
        }
    }
}

impl<T> fmt::Debug for IdentityFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityFn")
            .field("derived_from", &self.derived_from)
            .finish_non_exhaustive()
    }
}

/// Short, human-readable entity name for `T`.
///
/// `alloc::sync::Arc<my_app::model::Stock>` becomes `Stock`.
#[must_use]
pub fn entity_name_of<T: ?Sized>() -> String {
    short_type_name(std::any::type_name::<T>())
}

fn short_type_name(full: &str) -> String {
    const WRAPPERS: [&str; 3] = ["alloc::sync::Arc<", "alloc::rc::Rc<", "alloc::boxed::Box<"];

    let mut name = full.trim();
    while let Some(inner) = WRAPPERS
        .iter()
        .find_map(|w| name.strip_prefix(w).and_then(|rest| rest.strip_suffix('>')))
    {
        name = inner.trim();
    }

    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Derives an identity function from the key naming convention.
///
/// `probe` is any instance of the entity; only its field names and the shape
/// of the key field are inspected.
pub(crate) fn derive_identity<T: 'static>(
    entity_name: &str,
    convention: &KeyConvention,
    to_json: ToJson<T>,
    probe: &T,
) -> MockResult<IdentityFn<T>> {
    let candidates = convention.candidates(entity_name);
    let not_derivable = || ConfigurationError::KeyNotDerivable {
        entity: entity_name.to_string(),
        tried: candidates.clone(),
    };

    let json = to_json(probe).map_err(|e| MockError::KeyExtraction {
        entity: entity_name.to_string(),
        message: e.to_string(),
    })?;
    let Value::Object(fields) = json else {
        return Err(not_derivable().into());
    };

    let property = candidates
        .iter()
        .find_map(|candidate| {
            fields
                .keys()
                .find(|field| convention.name_matches(candidate, field))
        })
        .cloned()
        .ok_or_else(not_derivable)?;

    // Reject keys that could never compare against scalar lookups.
    json_to_key(entity_name, &property, &fields[&property])?;

    tracing::debug!(entity = entity_name, property = %property, "derived identity function");

    let entity = entity_name.to_string();
    let field = property.clone();
    Ok(IdentityFn {
        inner: Arc::new(move |e: &T| {
            let json = to_json(e).map_err(|err| MockError::KeyExtraction {
                entity: entity.clone(),
                message: err.to_string(),
            })?;
            let value = json.get(&field).ok_or_else(|| MockError::KeyExtraction {
                entity: entity.clone(),
                message: format!("field '{field}' missing from serialized entity"),
            })?;
            json_to_key(&entity, &field, value)
        }),
        derived_from: Some(property),
    })
}

fn json_to_key(entity: &str, property: &str, value: &Value) -> MockResult<KeyValue> {
    let unsupported = |shape: &str| ConfigurationError::UnsupportedKeyShape {
        entity: entity.to_string(),
        property: property.to_string(),
        shape: shape.to_string(),
    };

    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| KeyPart::from_json(item).ok_or_else(|| unsupported("nested composite")))
            .collect::<Result<Vec<_>, _>>()
            .map(KeyValue::Composite)
            .map_err(Into::into),
        Value::Object(_) => Err(unsupported("object").into()),
        scalar => KeyPart::from_json(scalar)
            .map(KeyValue::Scalar)
            .ok_or_else(|| unsupported("unknown").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Person {
        id: i32,
        name: String,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Stock {
        stock_id: i32,
        ticker: String,
    }

    #[derive(Serialize)]
    struct Plan {
        entity_id: i32,
    }

    #[derive(Serialize)]
    struct Nested {
        id: Inner,
    }

    #[derive(Serialize)]
    struct Inner {
        a: i32,
    }

    fn derive<T: Serialize + 'static>(probe: &T) -> MockResult<IdentityFn<T>> {
        derive_identity(
            &entity_name_of::<T>(),
            &KeyConvention::default(),
            to_json::<T>,
            probe,
        )
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("my_app::model::Stock"), "Stock");
        assert_eq!(short_type_name("alloc::sync::Arc<my_app::Person>"), "Person");
        assert_eq!(short_type_name("my_app::Wrapper<my_app::Person>"), "Wrapper");
        assert_eq!(entity_name_of::<Person>(), "Person");
        assert_eq!(entity_name_of::<Arc<Person>>(), "Person");
    }

    #[test]
    fn test_derives_id_property() {
        let probe = Person {
            id: 0,
            name: String::new(),
        };
        let f = derive(&probe).unwrap();
        assert_eq!(f.derived_from(), Some("id"));

        let p = Person {
            id: 7,
            name: "a".into(),
        };
        assert_eq!(f.key_of(&p).unwrap(), KeyValue::from(7_i32));
    }

    #[test]
    fn test_derives_entity_name_property() {
        let probe = Stock {
            stock_id: 1,
            ticker: "a".into(),
        };
        let f = derive(&probe).unwrap();
        assert_eq!(f.derived_from(), Some("StockId"));
        assert_eq!(f.key_of(&probe).unwrap(), KeyValue::from(1_i32));
    }

    #[test]
    fn test_derives_snake_case_entity_name_property() {
        #[derive(Serialize)]
        struct Holding {
            holding_id: u32,
            count: u32,
        }

        let probe = Holding {
            holding_id: 9,
            count: 1,
        };
        let f = derive(&probe).unwrap();
        assert_eq!(f.derived_from(), Some("holding_id"));
        assert_eq!(f.key_of(&probe).unwrap(), KeyValue::from(9_u32));
    }

    #[test]
    fn test_unrecognized_key_is_configuration_error() {
        let err = derive(&Plan { entity_id: 1 }).unwrap_err();
        assert!(err.is_configuration());
        let msg = err.to_string();
        assert!(msg.contains("Plan"));
        assert!(msg.contains("PlanId"));
    }

    #[test]
    fn test_object_key_is_rejected() {
        let err = derive(&Nested { id: Inner { a: 1 } }).unwrap_err();
        assert!(matches!(
            err,
            MockError::Configuration(ConfigurationError::UnsupportedKeyShape { .. })
        ));
    }

    #[test]
    fn test_explicit_identity_fn() {
        let f = IdentityFn::new(|p: &Plan| p.entity_id);
        assert_eq!(f.key_of(&Plan { entity_id: 3 }).unwrap(), KeyValue::from(3_i32));
        assert!(f.derived_from().is_none());
    }
}
