//! Interned string identifiers used throughout the crate.
//!
//! IDs are thin wrappers around `Rc<str>` so they can be cloned freely when
//! used as map keys without copying the underlying string.

/// Define a newtype wrapper around `Rc<str>` for use as an identifier
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(std::rc::Rc<str>);

        impl $name {
            /// The identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value.as_str().into())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(s.into())
            }
        }
    };
}
pub(crate) use define_id_type;

define_id_type! {PlantID}
define_id_type! {PeriodID}
define_id_type! {ModeID}
define_id_type! {ScenarioID}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn id_roundtrip() {
        let id: PlantID = "PLANT1".into();
        assert_eq!(id.as_str(), "PLANT1");
        assert_eq!(id.to_string(), "PLANT1");
        assert_eq!(id, "PLANT1".into());
    }

    #[test]
    fn id_serde() {
        let id: ModeID = "Rail".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Rail\"");
        let back: ModeID = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn rc_is_shared_on_clone() {
        let id: PeriodID = "2025-01".into();
        let clone = id.clone();
        assert!(Rc::ptr_eq(&id.0, &clone.0));
    }
}
