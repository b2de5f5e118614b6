//! Auxiliary data attached to failures.
//!
//! Every node in a failure chain can carry an ordered set of key/value pairs
//! describing the runtime state at the point of failure: parameter values,
//! identifiers, timestamps. The values are stored as [`AuxValue`]s, which all
//! share a single [`Display`] rendering used by the data aggregators.
//!
//! Keys never collide. [`AuxData::insert_checked`] relocates a value whose
//! key is already taken under a numbered key instead of overwriting it:
//!
//! ```
//! use faultchain::aux_data::AuxData;
//!
//! let mut data = AuxData::new();
//! data.insert_checked("Param1", 10);
//! data.insert_checked("Param1", "X35");
//! data.insert_checked("Param1", None::<&str>);
//!
//! let keys: Vec<&str> = data.keys().collect();
//! assert_eq!(keys, ["Param1", "Param1-1", "Param1-2"]);
//! assert_eq!(data.get("Param1-2").map(|v| v.to_string()).as_deref(), Some("NULL"));
//! ```
//!
//! # Known limitation
//!
//! Only the suffixes `-1` through `-100` are tried. Once all of them are
//! occupied further values for that key are dropped without an error; a
//! `tracing` debug event is the only trace of the drop.

use std::{
    borrow::Cow,
    fmt::{self, Display},
    sync::Arc,
};

use chrono::{DateTime, NaiveDateTime, TimeZone};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

/// The highest numeric suffix tried when a key is already present.
pub const MAX_KEY_SUFFIX: usize = 100;

/// Rendering used for absent values.
pub const NULL_LITERAL: &str = "NULL";

/// A single auxiliary value.
///
/// Values are rendered through [`Display`]. All variants except
/// [`AuxValue::Opaque`] render infallibly.
#[derive(Clone)]
pub enum AuxValue {
    /// An absent value, rendered as `NULL`.
    Null,
    /// A text value.
    Text(String),
    /// A signed integer.
    Integer(i64),
    /// An unsigned integer.
    Unsigned(u64),
    /// A floating point number.
    Float(f64),
    /// A boolean, rendered as `True` or `False`.
    Bool(bool),
    /// A local date and time, rendered as `4/17/2020 8:26:09 PM`.
    DateTime(NaiveDateTime),
    /// Any other displayable value.
    ///
    /// The value's own [`Display`] implementation is used as-is, including
    /// any error it returns.
    Opaque(Arc<dyn Display + Send + Sync>),
}

impl AuxValue {
    /// Wraps an arbitrary displayable value.
    pub fn opaque<D>(value: D) -> Self
    where
        D: Display + Send + Sync + 'static,
    {
        AuxValue::Opaque(Arc::new(value))
    }

    /// Returns `true` for [`AuxValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, AuxValue::Null)
    }

    /// Returns the text if this is an [`AuxValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AuxValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for AuxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuxValue::Null => f.write_str(NULL_LITERAL),
            AuxValue::Text(text) => f.write_str(text),
            AuxValue::Integer(value) => write!(f, "{value}"),
            AuxValue::Unsigned(value) => write!(f, "{value}"),
            AuxValue::Float(value) => write!(f, "{value}"),
            AuxValue::Bool(true) => f.write_str("True"),
            AuxValue::Bool(false) => f.write_str("False"),
            AuxValue::DateTime(value) => write!(f, "{}", value.format("%-m/%-d/%Y %-I:%M:%S %p")),
            AuxValue::Opaque(value) => Display::fmt(value, f),
        }
    }
}

impl fmt::Debug for AuxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuxValue::Null => f.write_str("Null"),
            AuxValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            AuxValue::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            AuxValue::Unsigned(value) => f.debug_tuple("Unsigned").field(value).finish(),
            AuxValue::Float(value) => f.debug_tuple("Float").field(value).finish(),
            AuxValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            AuxValue::DateTime(value) => f.debug_tuple("DateTime").field(value).finish(),
            AuxValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl PartialEq for AuxValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AuxValue::Null, AuxValue::Null) => true,
            (AuxValue::Text(a), AuxValue::Text(b)) => a == b,
            (AuxValue::Integer(a), AuxValue::Integer(b)) => a == b,
            (AuxValue::Unsigned(a), AuxValue::Unsigned(b)) => a == b,
            (AuxValue::Float(a), AuxValue::Float(b)) => a == b,
            (AuxValue::Bool(a), AuxValue::Bool(b)) => a == b,
            (AuxValue::DateTime(a), AuxValue::DateTime(b)) => a == b,
            (AuxValue::Opaque(a), AuxValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for AuxValue {
    fn from(value: &str) -> Self {
        AuxValue::Text(value.to_owned())
    }
}

impl From<String> for AuxValue {
    fn from(value: String) -> Self {
        AuxValue::Text(value)
    }
}

impl From<Cow<'_, str>> for AuxValue {
    fn from(value: Cow<'_, str>) -> Self {
        AuxValue::Text(value.into_owned())
    }
}

impl From<char> for AuxValue {
    fn from(value: char) -> Self {
        AuxValue::Text(value.to_string())
    }
}

impl From<bool> for AuxValue {
    fn from(value: bool) -> Self {
        AuxValue::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($variant:ident => $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for AuxValue {
                fn from(value: $source) -> Self {
                    AuxValue::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_from_int!(Integer => i64: i8, i16, i32, i64);
impl_from_int!(Unsigned => u64: u8, u16, u32, u64);
impl_from_int!(Float => f64: f32, f64);

impl From<isize> for AuxValue {
    fn from(value: isize) -> Self {
        AuxValue::Integer(value as i64)
    }
}

impl From<usize> for AuxValue {
    fn from(value: usize) -> Self {
        AuxValue::Unsigned(value as u64)
    }
}

impl From<NaiveDateTime> for AuxValue {
    fn from(value: NaiveDateTime) -> Self {
        AuxValue::DateTime(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for AuxValue {
    fn from(value: DateTime<Tz>) -> Self {
        AuxValue::DateTime(value.naive_local())
    }
}

impl<T: Into<AuxValue>> From<Option<T>> for AuxValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AuxValue::Null, Into::into)
    }
}

/// An ordered collection of auxiliary key/value pairs.
///
/// Iteration follows insertion order. Keys are unique: values are only ever
/// added through [`AuxData::insert_checked`], which never overwrites.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuxData {
    entries: IndexMap<String, AuxValue, FxBuildHasher>,
}

impl AuxData {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, or under the first free `"{key}-N"` with
    /// `N` in `1..=100` when `key` is already present.
    ///
    /// Returns the key the value was stored under, or `None` when every
    /// suffixed key was taken and the value was dropped.
    pub fn insert_checked(&mut self, key: &str, value: impl Into<AuxValue>) -> Option<&str> {
        let value = value.into();
        let slot = if self.entries.contains_key(key) {
            let Some(free) = (1..=MAX_KEY_SUFFIX)
                .map(|n| format!("{key}-{n}"))
                .find(|candidate| !self.entries.contains_key(candidate.as_str()))
            else {
                tracing::debug!(
                    key,
                    max_suffix = MAX_KEY_SUFFIX,
                    "auxiliary value dropped, every suffixed key is taken"
                );
                return None;
            };
            free
        } else {
            key.to_owned()
        };

        let (index, _) = self.entries.insert_full(slot, value);
        self.entries.get_index(index).map(|(key, _)| key.as_str())
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub(crate) fn remove(&mut self, key: &str) -> Option<AuxValue> {
        self.entries.shift_remove(key)
    }

    /// Returns the value stored under exactly `key`.
    pub fn get(&self, key: &str) -> Option<&AuxValue> {
        self.entries.get(key)
    }

    /// Returns `true` if a value is stored under exactly `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &AuxValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Collision-safe insert into an optional store.
///
/// An absent store is a no-op. Otherwise this is
/// [`AuxData::insert_checked`].
pub fn insert_checked<'s>(
    store: Option<&'s mut AuxData>,
    key: &str,
    value: impl Into<AuxValue>,
) -> Option<&'s str> {
    store?.insert_checked(key, value)
}

impl<K, V> FromIterator<(K, V)> for AuxData
where
    K: AsRef<str>,
    V: Into<AuxValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = AuxData::new();
        data.extend(iter);
        data
    }
}

impl<K, V> Extend<(K, V)> for AuxData
where
    K: AsRef<str>,
    V: Into<AuxValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert_checked(key.as_ref(), value);
        }
    }
}
