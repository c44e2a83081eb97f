//! Keyed attribute maps.
//!
//! Parser records carry attributes as flat `(name, payload...)` tuples. The decoder folds a list of
//! tuples into an [`AttributeMap`], where a bare name becomes a marker, a single payload is stored
//! as is, and several payloads are kept as an ordered tuple.

use crate::arena::IrArena;
use crate::ty::Type;
use indexmap::IndexMap;
use llir_syntax::{RawAttribute, RawAttributeValue};
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum AttributePayload<'ir> {
    Int(i64),
    Str(String),
    Type(&'ir Type<'ir>),
    Strings(Vec<String>),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue<'ir> {
    Marker,
    Single(AttributePayload<'ir>),
    Tuple(Vec<AttributePayload<'ir>>),
}

/// Mapping from attribute name to its payloads, in the order the names were first seen.
///
/// When a name repeats in the input, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap<'ir> {
    entries: IndexMap<String, AttributeValue<'ir>>,
}

impl<'ir> AttributeMap<'ir> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(arena: &IrArena<'ir>, attributes: &[RawAttribute]) -> Self {
        let mut map = Self::new();
        for attribute in attributes {
            let mut payloads = attribute
                .values
                .iter()
                .map(|value| AttributePayload::decode(arena, value))
                .collect::<Vec<_>>();
            let value = match payloads.len() {
                0 => AttributeValue::Marker,
                1 => AttributeValue::Single(payloads.remove(0)),
                _ => AttributeValue::Tuple(payloads),
            };
            map.insert(attribute.name.clone(), value);
        }
        map
    }

    /// Decode one map per layer, keeping the layers index aligned.
    pub fn decode_layers(arena: &IrArena<'ir>, layers: &[Vec<RawAttribute>]) -> Vec<Self> {
        layers
            .iter()
            .map(|layer| Self::decode(arena, layer))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue<'ir>) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue<'ir>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue<'ir>)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Get the single payload stored under `name`.
    pub fn payload(&self, name: &str) -> Option<&AttributePayload<'ir>> {
        match self.get(name)? {
            AttributeValue::Single(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.payload(name)? {
            AttributePayload::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.payload(name)? {
            AttributePayload::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn strings(&self, name: &str) -> Option<&[String]> {
        match self.payload(name)? {
            AttributePayload::Strings(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn ty(&self, name: &str) -> Option<&'ir Type<'ir>> {
        match self.payload(name)? {
            AttributePayload::Type(ty) => Some(*ty),
            _ => None,
        }
    }

    /// Get every payload under `name` as integers, such as the bounds of `vscale_range`.
    pub fn ints(&self, name: &str) -> Option<Vec<i64>> {
        let payloads = match self.get(name)? {
            AttributeValue::Marker => return Some(vec![]),
            AttributeValue::Single(payload) => std::slice::from_ref(payload),
            AttributeValue::Tuple(payloads) => payloads.as_slice(),
        };
        payloads
            .iter()
            .map(|payload| match payload {
                AttributePayload::Int(value) => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl<'ir> AttributePayload<'ir> {
    fn decode(arena: &IrArena<'ir>, value: &RawAttributeValue) -> Self {
        match value {
            RawAttributeValue::Int(value) => Self::Int(*value),
            RawAttributeValue::Str(value) => Self::Str(value.clone()),
            RawAttributeValue::Type(ty) => Self::Type(arena.lower_type(ty)),
            RawAttributeValue::Strings(values) => Self::Strings(values.clone()),
            RawAttributeValue::None => Self::None,
        }
    }
}

impl Display for AttributePayload<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AttributePayload::Int(value) => write!(f, "{}", value),
            AttributePayload::Str(value) => write!(f, "'{}'", value),
            AttributePayload::Type(ty) => write!(f, "{}", ty),
            AttributePayload::Strings(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}'", value)?;
                }
                write!(f, "]")
            }
            AttributePayload::None => write!(f, "None"),
        }
    }
}

impl Display for AttributeValue<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Marker => write!(f, "()"),
            AttributeValue::Single(payload) => write!(f, "{}", payload),
            AttributeValue::Tuple(payloads) => {
                write!(f, "(")?;
                for (i, payload) in payloads.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", payload)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Display for AttributeMap<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}': {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Layered attribute lists in the order `[function, return, arg0, arg1, ...]`.
///
/// Layers past the last non-empty one may be absent, in which case the accessors return `None`.
pub trait AttributeLayers<'ir> {
    fn attribute_layers(&self) -> &[AttributeMap<'ir>];

    fn function_attributes(&self) -> Option<&AttributeMap<'ir>> {
        self.attribute_layers().first()
    }

    fn ret_attributes(&self) -> Option<&AttributeMap<'ir>> {
        self.attribute_layers().get(1)
    }

    fn arguments_attributes(&self) -> &[AttributeMap<'ir>] {
        self.attribute_layers().get(2..).unwrap_or(&[])
    }

    fn argument_attributes(&self, index: usize) -> Option<&AttributeMap<'ir>> {
        self.arguments_attributes().get(index)
    }
}
