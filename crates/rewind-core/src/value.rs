#![forbid(unsafe_code)]

//! Dynamic values and shared container handles.
//!
//! # Design
//!
//! [`Value`] is the data model every action operates on. Scalars are stored
//! inline; containers are reference-counted, interior-mutable handles
//! (`Rc<RefCell<..>>`). Cloning a [`Value`] clones the handle, so two clones
//! of an array value alias the same storage. This is what lets an action hold
//! "a reference to its target" while the caller keeps mutating through its
//! own handle.
//!
//! | Variant  | Handle        | Storage                         |
//! |----------|---------------|---------------------------------|
//! | `Array`  | [`ArrayRef`]  | `Vec<Value>`                    |
//! | `Record` | [`RecordRef`] | `IndexMap<String, Value>`       |
//! | `Map`    | [`MapRef`]    | `IndexMap<EntryKey, Value>`     |
//! | `Set`    | [`SetRef`]    | `IndexSet<EntryKey>`            |
//! | `Date`   | [`DateRef`]   | `NaiveDateTime` (UTC)           |
//!
//! # Equality
//!
//! `PartialEq` is structural: two arrays are equal when their elements are.
//! Record and map equality ignore insertion order. Identity is available
//! through [`Value::ptr_eq`]. Map and set keys use [`EntryKey`], which
//! compares containers by identity (SameValueZero).
//!
//! # Failure Modes
//!
//! - **Cycles**: structural equality and `Debug` recurse without a visited
//!   set and will overflow the stack on cyclic graphs. [`Value::deep_clone`]
//!   is cycle-safe.
//! - **Re-entrant borrow**: mutating a container while one of its borrows is
//!   alive panics (RefCell borrow rules).

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use chrono::{NaiveDateTime, SecondsFormat};
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

macro_rules! shared_handle {
    ($(#[$meta:meta])* $name:ident, $inner:ty) => {
        $(#[$meta])*
        #[derive(Clone, Default)]
        pub struct $name(Rc<RefCell<$inner>>);

        impl $name {
            /// Wrap `inner` in a new shared handle.
            #[must_use]
            pub fn new(inner: $inner) -> Self {
                Self(Rc::new(RefCell::new(inner)))
            }

            /// Borrow the underlying storage.
            pub fn borrow(&self) -> Ref<'_, $inner> {
                self.0.borrow()
            }

            /// Mutably borrow the underlying storage.
            pub fn borrow_mut(&self) -> RefMut<'_, $inner> {
                self.0.borrow_mut()
            }

            /// Whether both handles point at the same storage.
            #[must_use]
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Rc::ptr_eq(&self.0, &other.0)
            }

            /// Address of the shared storage, stable while any handle is alive.
            #[must_use]
            pub fn addr(&self) -> usize {
                Rc::as_ptr(&self.0) as *const () as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&*self.0.borrow()).finish()
            }
        }
    };
}

shared_handle!(
    /// Shared handle to array storage.
    ArrayRef,
    Vec<Value>
);
shared_handle!(
    /// Shared handle to an insertion-ordered string-keyed record.
    RecordRef,
    IndexMap<String, Value>
);
shared_handle!(
    /// Shared handle to an insertion-ordered map with arbitrary keys.
    MapRef,
    IndexMap<EntryKey, Value>
);
shared_handle!(
    /// Shared handle to an insertion-ordered set.
    SetRef,
    IndexSet<EntryKey>
);
shared_handle!(
    /// Shared handle to a mutable point in time (UTC).
    DateRef,
    NaiveDateTime
);

impl ArrayRef {
    /// Current number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.borrow().len()
    }

    /// Whether the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.borrow().is_empty()
    }

    /// Clone of the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.borrow().get(index).cloned()
    }
}

/// Structural category of a container value.
///
/// Kinds form a small fallback chain used when looking up interception
/// handlers: every specialised kind falls back to [`ContainerKind::Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Record,
    Map,
    Set,
    Date,
}

impl ContainerKind {
    /// All kinds, most specific first.
    pub const ALL: [Self; 5] = [Self::Array, Self::Map, Self::Set, Self::Date, Self::Record];

    /// The kind this one falls back to, if any.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Record => None,
            Self::Array | Self::Map | Self::Set | Self::Date => Some(Self::Record),
        }
    }

    /// Lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Record => "record",
            Self::Map => "map",
            Self::Set => "set",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamic value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Record(RecordRef),
    Map(MapRef),
    Set(SetRef),
    Date(DateRef),
}

impl Value {
    /// New array value holding `items`.
    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(ArrayRef::new(items.into_iter().collect()))
    }

    /// New record value from `(key, value)` entries, in order.
    #[must_use]
    pub fn record<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Record(RecordRef::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// New map value from `(key, value)` entries, in order.
    #[must_use]
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(MapRef::new(
            entries.into_iter().map(|(k, v)| (EntryKey(k), v)).collect(),
        ))
    }

    /// New set value from `values`, in order, dropping duplicates.
    #[must_use]
    pub fn set(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(SetRef::new(values.into_iter().map(EntryKey).collect()))
    }

    /// New date value.
    #[must_use]
    pub fn date(at: NaiveDateTime) -> Self {
        Self::Date(DateRef::new(at))
    }

    /// Lowercase name of the variant.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Date(_) => "date",
        }
    }

    /// Container kind, or `None` for scalars.
    #[must_use]
    pub const fn container_kind(&self) -> Option<ContainerKind> {
        match self {
            Self::Array(_) => Some(ContainerKind::Array),
            Self::Record(_) => Some(ContainerKind::Record),
            Self::Map(_) => Some(ContainerKind::Map),
            Self::Set(_) => Some(ContainerKind::Set),
            Self::Date(_) => Some(ContainerKind::Date),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => None,
        }
    }

    #[must_use]
    pub const fn is_container(&self) -> bool {
        self.container_kind().is_some()
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&RecordRef> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&SetRef> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&DateRef> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Address of the container storage, `None` for scalars.
    #[must_use]
    pub fn container_addr(&self) -> Option<usize> {
        match self {
            Self::Array(a) => Some(a.addr()),
            Self::Record(r) => Some(r.addr()),
            Self::Map(m) => Some(m.addr()),
            Self::Set(s) => Some(s.addr()),
            Self::Date(d) => Some(d.addr()),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => None,
        }
    }

    /// Whether both values are the same container.
    ///
    /// Always `false` for scalars; use `==` to compare those.
    #[must_use]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.container_addr(), other.container_addr()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// SameValueZero: `NaN` equals `NaN`, `+0` equals `-0`, containers
    /// compare by identity.
    #[must_use]
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Self::String(a), Self::String(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }

    /// Structural clone sharing no container with `self`.
    ///
    /// A container reachable through several paths (or through a cycle) is
    /// cloned once and re-linked, so the clone has the same shape.
    #[must_use]
    pub fn deep_clone(&self) -> Value {
        let mut seen = HashMap::new();
        self.deep_clone_in(&mut seen)
    }

    fn deep_clone_in(&self, seen: &mut HashMap<usize, Value>) -> Value {
        if let Some(done) = self.container_addr().and_then(|addr| seen.get(&addr)) {
            return done.clone();
        }
        match self {
            Self::Array(source) => {
                let copy = ArrayRef::default();
                seen.insert(source.addr(), Self::Array(copy.clone()));
                let items: Vec<Value> = source
                    .borrow()
                    .iter()
                    .map(|v| v.deep_clone_in(seen))
                    .collect();
                *copy.borrow_mut() = items;
                Self::Array(copy)
            }
            Self::Record(source) => {
                let copy = RecordRef::default();
                seen.insert(source.addr(), Self::Record(copy.clone()));
                let entries: IndexMap<String, Value> = source
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone_in(seen)))
                    .collect();
                *copy.borrow_mut() = entries;
                Self::Record(copy)
            }
            Self::Map(source) => {
                let copy = MapRef::default();
                seen.insert(source.addr(), Self::Map(copy.clone()));
                let entries: IndexMap<EntryKey, Value> = source
                    .borrow()
                    .iter()
                    .map(|(k, v)| (EntryKey(k.0.deep_clone_in(seen)), v.deep_clone_in(seen)))
                    .collect();
                *copy.borrow_mut() = entries;
                Self::Map(copy)
            }
            Self::Set(source) => {
                let copy = SetRef::default();
                seen.insert(source.addr(), Self::Set(copy.clone()));
                let members: IndexSet<EntryKey> = source
                    .borrow()
                    .iter()
                    .map(|k| EntryKey(k.0.deep_clone_in(seen)))
                    .collect();
                *copy.borrow_mut() = members;
                Self::Set(copy)
            }
            Self::Date(source) => {
                let copy = Self::date(*source.borrow());
                seen.insert(source.addr(), copy.clone());
                copy
            }
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => self.clone(),
        }
    }

    /// Total order used by the default array sort.
    ///
    /// `Null < Bool < Number < String < Date < other containers`. Numbers use
    /// `total_cmp`; containers other than dates compare equal.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Date(_) => 4,
                Value::Array(_) | Value::Record(_) | Value::Map(_) | Value::Set(_) => 5,
            }
        }
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.borrow().cmp(&*b.borrow()),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Convert to JSON.
    ///
    /// Maps become `[[key, value], ...]`, sets become arrays, dates become
    /// RFC 3339 strings and non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(a) => JsonValue::Array(a.borrow().iter().map(Self::to_json).collect()),
            Self::Record(r) => JsonValue::Object(
                r.borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Map(m) => JsonValue::Array(
                m.borrow()
                    .iter()
                    .map(|(k, v)| JsonValue::Array(vec![k.0.to_json(), v.to_json()]))
                    .collect(),
            ),
            Self::Set(s) => JsonValue::Array(s.borrow().iter().map(|k| k.0.to_json()).collect()),
            Self::Date(d) => JsonValue::String(format_date(&d.borrow())),
        }
    }
}

/// Format a date the way [`Value::to_json`] does.
#[must_use]
pub fn format_date(at: &NaiveDateTime) -> String {
    at.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Self::Record(a), Self::Record(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Self::Set(a), Self::Set(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Self::Date(a), Self::Date(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(a) => f.debug_list().entries(a.borrow().iter()).finish(),
            Self::Record(r) => f.debug_map().entries(r.borrow().iter()).finish(),
            Self::Map(m) => {
                f.write_str("Map ")?;
                f.debug_map()
                    .entries(m.borrow().iter().map(|(k, v)| (&k.0, v)))
                    .finish()
            }
            Self::Set(s) => {
                f.write_str("Set ")?;
                f.debug_set().entries(s.borrow().iter().map(|k| &k.0)).finish()
            }
            Self::Date(d) => write!(f, "Date({})", format_date(&d.borrow())),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::array(items.into_iter().map(Self::from)),
            JsonValue::Object(entries) => {
                Self::record(entries.into_iter().map(|(k, v)| (k, Self::from(v))))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(ArrayRef::new(items))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(at: NaiveDateTime) -> Self {
        Self::date(at)
    }
}

impl From<ArrayRef> for Value {
    fn from(handle: ArrayRef) -> Self {
        Self::Array(handle)
    }
}

impl From<RecordRef> for Value {
    fn from(handle: RecordRef) -> Self {
        Self::Record(handle)
    }
}

impl From<MapRef> for Value {
    fn from(handle: MapRef) -> Self {
        Self::Map(handle)
    }
}

impl From<SetRef> for Value {
    fn from(handle: SetRef) -> Self {
        Self::Set(handle)
    }
}

impl From<DateRef> for Value {
    fn from(handle: DateRef) -> Self {
        Self::Date(handle)
    }
}

/// Map key / set member with SameValueZero semantics.
#[derive(Clone)]
pub struct EntryKey(pub Value);

impl EntryKey {
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl PartialEq for EntryKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_value_zero(&other.0)
    }
}

impl Eq for EntryKey {}

impl Hash for EntryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Number(n) => {
                2u8.hash(state);
                let bits = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0f64.to_bits()
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            container => {
                4u8.hash(state);
                container.container_addr().hash(state);
            }
        }
    }
}

impl fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Value> for EntryKey {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
