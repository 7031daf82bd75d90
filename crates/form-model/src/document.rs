//! Nested answer documents.
//!
//! Documents mirror the form's page layout: a top-level object keyed by page
//! name whose values are objects of string leaves, nested objects, or
//! sequences of objects for repeated groups. Every scalar in the serialized
//! input is read as a string (`true`, `42`; `null` becomes the empty string),
//! so downstream code only ever handles text.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Keys keep the order they were read or inserted in.
pub type Object = IndexMap<String, DocumentNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    Scalar(String),
    Object(Object),
    Sequence(Vec<DocumentNode>),
}

impl DocumentNode {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[DocumentNode]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for DocumentNode {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for DocumentNode {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Object> for DocumentNode {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl Serialize for DocumentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(value) => serializer.serialize_str(value),
            Self::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for DocumentNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = DocumentNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, a mapping or a sequence")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(String::new()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(DocumentNode::Scalar(String::new()))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(DocumentNode::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut object = Object::new();
        while let Some(key) = map.next_key::<ScalarKey>()? {
            let value = map.next_value()?;
            object.insert(key.0, value);
        }
        Ok(DocumentNode::Object(object))
    }
}

/// Mapping key read as text whatever its scalar type.
struct ScalarKey(String);

impl<'de> Deserialize<'de> for ScalarKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = ScalarKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scalar mapping key")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<ScalarKey, E> {
                Ok(ScalarKey(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ScalarKey, E> {
                Ok(ScalarKey(value.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ScalarKey, E> {
                Ok(ScalarKey(value.to_string()))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<ScalarKey, E> {
                Ok(ScalarKey(value.to_string()))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ScalarKey, E> {
                Ok(ScalarKey(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<ScalarKey, E> {
                Ok(ScalarKey(value))
            }

            fn visit_unit<E: de::Error>(self) -> Result<ScalarKey, E> {
                Ok(ScalarKey(String::new()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// A whole form document: page name to page content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Object);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, name: &str) -> Option<&DocumentNode> {
        self.0.get(name)
    }

    pub fn insert_page(&mut self, name: impl Into<String>, content: DocumentNode) {
        self.0.insert(name.into(), content);
    }

    pub fn pages(&self) -> impl Iterator<Item = (&str, &DocumentNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Object {
        self.0
    }
}

impl From<Object> for Document {
    fn from(value: Object) -> Self {
        Self(value)
    }
}
