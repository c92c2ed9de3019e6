// used to print out readable forms of a datum
use std::fmt;
use std::fmt::Write as _;

// mapping entries keep a side index for O(1) lookup next to their order
use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use seahash::SeaHasher;

// used for the persisted form and for `--set` / `--edit` payloads
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

/// A single stored value.
///
/// The database is schema-less: any position in the tree holds a string, a
/// list of strings, or a mapping from string keys to further values. Absence
/// is not a stored shape; navigation reports it as `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datum {
    Text(String),
    List(Vec<String>),
    Map(Mapping),
}

impl Datum {
    /// The shape name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Text(_) => "string",
            Datum::List(_) => "list",
            Datum::Map(_) => "dict",
        }
    }
}

/// A mapping from string keys to [`Datum`] values that remembers insertion
/// order.
///
/// Key order is irrelevant for lookups but observable through display,
/// `--keys` and search, so entries are kept in a `HashMap` with the arrival
/// order alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    order: Vec<String>,
    kept: HashMap<String, Datum, KeyHasher>,
}

impl Mapping {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            kept: HashMap::default(),
        }
    }
    pub fn len(&self) -> usize {
        self.order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.kept.contains_key(key)
    }
    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.kept.get(key)
    }
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Datum> {
        self.kept.get_mut(key)
    }
    /// Inserts a value, keeping the key's original position when it is
    /// already present.
    pub fn insert(&mut self, key: String, value: Datum) -> Option<Datum> {
        match self.kept.insert(key.clone(), value) {
            Some(previous) => Some(previous),
            None => {
                self.order.push(key);
                None
            }
        }
    }
    pub fn remove(&mut self, key: &str) -> Option<Datum> {
        let removed = self.kept.remove(key);
        if removed.is_some() {
            self.order.retain(|kept_key| kept_key != key);
        }
        removed
    }
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.kept.get(key).map(|value| (key.as_str(), value)))
    }
}

/// Renders the single-line dict form used when a mapping is indexed, e.g.
/// `{'granny': 'good'}`. Backslashes and single quotes are escaped.
impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (position, (key, value)) in self.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, key)?;
            f.write_str(": ")?;
            match value {
                Datum::Text(text) => write_quoted(f, text)?,
                Datum::List(items) => {
                    f.write_str("[")?;
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            f.write_str(", ")?;
                        }
                        write_quoted(f, item)?;
                    }
                    f.write_str("]")?;
                }
                Datum::Map(inner) => write!(f, "{inner}")?,
            }
        }
        f.write_str("}")
    }
}

fn write_quoted(f: &mut fmt::Formatter, text: &str) -> fmt::Result {
    f.write_str("'")?;
    for character in text.chars() {
        match character {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            other => f.write_char(other)?,
        }
    }
    f.write_str("'")
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Datum::Text(text) => serializer.serialize_str(text),
            Datum::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Datum::Map(mapping) => mapping.serialize(serializer),
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Deserialization accepts arbitrary JSON and coerces it into the three
/// representable shapes: scalars other than strings become their JSON text
/// form, and non-scalar list elements become their compact JSON text. Object
/// keys keep their document order.
impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(DatumVisitor)
    }
}

struct DatumVisitor;

impl<'de> Visitor<'de> for DatumVisitor {
    type Value = Datum;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }
    fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Datum, E> {
        Ok(Datum::Text(value.to_string()))
    }
    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Datum, E> {
        Ok(Datum::Text(value.to_string()))
    }
    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Datum, E> {
        Ok(Datum::Text(value.to_string()))
    }
    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Datum, E> {
        Ok(Datum::Text(value.to_string()))
    }
    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Datum, E> {
        Ok(Datum::Text(value.to_owned()))
    }
    fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Datum, E> {
        Ok(Datum::Text(value))
    }
    fn visit_unit<E: de::Error>(self) -> std::result::Result<Datum, E> {
        Ok(Datum::Text("null".to_owned()))
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Datum, A::Error> {
        let mut items = Vec::new();
        while let Some(element) = seq.next_element::<Datum>()? {
            items.push(match element {
                Datum::Text(text) => text,
                nested => serde_json::to_string(&nested).map_err(de::Error::custom)?,
            });
        }
        Ok(Datum::List(items))
    }
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Datum, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((key, value)) = access.next_entry::<String, Datum>()? {
            mapping.insert(key, value);
        }
        Ok(Datum::Map(mapping))
    }
}
