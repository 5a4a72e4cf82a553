#![forbid(unsafe_code)]

//! Kind-specific proxies.
//!
//! A proxy wraps one container handle together with an [`Interceptor`]. It
//! exposes the container's reads and its mutating methods, each of which
//! becomes a request routed through the interceptor. Any container handed
//! out, whether read or returned by a mutation (a popped element, spliced-out
//! items), is re-wrapped so later mutations of it are intercepted too.
//!
//! Proxies do not own their container: the caller keeps its own handle and
//! any number of proxies may wrap the same container.

use std::rc::Rc;

use rewind_core::container::array::Comparator;
use rewind_core::container::date::{DateParts, epoch_millis};
use rewind_core::{
    ActionResult, ArrayMutation, ArrayRef, ContainerKind, DateMutation, DateRef, EntryKey, Key,
    MapMutation, MapRef, RecordMutation, RecordRef, SetMutation, SetRef, SharedAction, Value,
};

use super::Interceptor;
use super::handler::Handler;

/// Escape hatches shared by every proxy.
pub trait Facade {
    /// The raw container, bypassing interception.
    fn target(&self) -> Value;

    /// The interception context this proxy reports to.
    fn interceptor(&self) -> &Interceptor;

    fn kind(&self) -> ContainerKind;

    /// The handler intercepting this proxy's mutations.
    fn handler(&self) -> Rc<dyn Handler> {
        self.interceptor().handler_for(self.kind())
    }

    /// Notify listeners of a hand-built action, then apply it.
    fn submit(&self, action: SharedAction) -> ActionResult<Value> {
        self.interceptor().submit(action)
    }
}

macro_rules! proxy_struct {
    ($(#[$meta:meta])* $name:ident, $handle:ty, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            target: $handle,
            interceptor: Interceptor,
        }

        impl $name {
            #[must_use]
            pub fn new(target: $handle, interceptor: Interceptor) -> Self {
                Self {
                    target,
                    interceptor,
                }
            }

            /// The wrapped handle.
            #[must_use]
            pub fn handle(&self) -> &$handle {
                &self.target
            }

            fn mutate(&self, mutation: impl Into<rewind_core::Mutation>) -> ActionResult<Proxied> {
                self.interceptor
                    .intercept(&Value::$variant(self.target.clone()), mutation)
                    .map(|result| self.interceptor.wrap(&result))
            }
        }

        impl Facade for $name {
            fn target(&self) -> Value {
                Value::$variant(self.target.clone())
            }

            fn interceptor(&self) -> &Interceptor {
                &self.interceptor
            }

            fn kind(&self) -> ContainerKind {
                ContainerKind::$variant
            }
        }
    };
}

proxy_struct!(
    /// Intercepting view of an array.
    ArrayProxy,
    ArrayRef,
    Array
);
proxy_struct!(
    /// Intercepting view of a record.
    RecordProxy,
    RecordRef,
    Record
);
proxy_struct!(
    /// Intercepting view of a map.
    MapProxy,
    MapRef,
    Map
);
proxy_struct!(
    /// Intercepting view of a set.
    SetProxy,
    SetRef,
    Set
);
proxy_struct!(
    /// Intercepting view of a date.
    DateProxy,
    DateRef,
    Date
);

// ============================================================================
// Proxied
// ============================================================================

/// A value as handed out by a proxy read.
#[derive(Debug, Clone)]
pub enum Proxied {
    Array(ArrayProxy),
    Record(RecordProxy),
    Map(MapProxy),
    Set(SetProxy),
    Date(DateProxy),
    /// Scalars are not wrapped.
    Value(Value),
}

impl Proxied {
    /// Wrap `value` with `interceptor`.
    #[must_use]
    pub fn new(value: Value, interceptor: Interceptor) -> Self {
        match value {
            Value::Array(h) => Self::Array(ArrayProxy::new(h, interceptor)),
            Value::Record(h) => Self::Record(RecordProxy::new(h, interceptor)),
            Value::Map(h) => Self::Map(MapProxy::new(h, interceptor)),
            Value::Set(h) => Self::Set(SetProxy::new(h, interceptor)),
            Value::Date(h) => Self::Date(DateProxy::new(h, interceptor)),
            scalar => Self::Value(scalar),
        }
    }

    /// The raw value, bypassing interception.
    #[must_use]
    pub fn target(&self) -> Value {
        match self {
            Self::Array(p) => p.target(),
            Self::Record(p) => p.target(),
            Self::Map(p) => p.target(),
            Self::Set(p) => p.target(),
            Self::Date(p) => p.target(),
            Self::Value(v) => v.clone(),
        }
    }

    /// Proxy as a [`Facade`], `None` for scalars.
    #[must_use]
    pub fn as_facade(&self) -> Option<&dyn Facade> {
        match self {
            Self::Array(p) => Some(p),
            Self::Record(p) => Some(p),
            Self::Map(p) => Some(p),
            Self::Set(p) => Some(p),
            Self::Date(p) => Some(p),
            Self::Value(_) => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayProxy> {
        match self {
            Self::Array(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&RecordProxy> {
        match self {
            Self::Record(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&MapProxy> {
        match self {
            Self::Map(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&SetProxy> {
        match self {
            Self::Set(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&DateProxy> {
        match self {
            Self::Date(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

// ============================================================================
// Arrays
// ============================================================================

impl ArrayProxy {
    #[must_use]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Proxied> {
        self.target.get(index).map(|v| self.interceptor.wrap(&v))
    }

    /// Every element, re-wrapped.
    #[must_use]
    pub fn items(&self) -> Vec<Proxied> {
        let items = self.target.borrow().clone();
        items.iter().map(|v| self.interceptor.wrap(v)).collect()
    }

    pub fn set_len(&self, length: usize) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::SetLength(length))
    }

    pub fn set(&self, index: usize, value: impl Into<Value>) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::SetIndex {
            index,
            value: value.into(),
        })
    }

    /// Append items; returns the new length.
    pub fn push(&self, items: impl IntoIterator<Item = Value>) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Push(items.into_iter().collect()))
    }

    pub fn pop(&self) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Pop)
    }

    pub fn shift(&self) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Shift)
    }

    /// Prepend items; returns the new length.
    pub fn unshift(&self, items: impl IntoIterator<Item = Value>) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Unshift(items.into_iter().collect()))
    }

    /// Returns the removed elements as a new array.
    pub fn splice(
        &self,
        start: isize,
        delete_count: Option<usize>,
        items: impl IntoIterator<Item = Value>,
    ) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Splice {
            start,
            delete_count,
            items: items.into_iter().collect(),
        })
    }

    pub fn copy_within(&self, target: isize, start: isize, end: Option<isize>) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::CopyWithin { target, start, end })
    }

    pub fn fill(&self, value: impl Into<Value>, start: isize, end: Option<isize>) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Fill {
            value: value.into(),
            start,
            end,
        })
    }

    /// Sort by [`Value::compare`].
    pub fn sort(&self) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Sort(None))
    }

    pub fn sort_by(
        &self,
        compare: impl Fn(&Value, &Value) -> std::cmp::Ordering + 'static,
    ) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Sort(Some(Comparator::new(compare))))
    }

    pub fn reverse(&self) -> ActionResult<Proxied> {
        self.mutate(ArrayMutation::Reverse)
    }
}

// ============================================================================
// Records
// ============================================================================

impl RecordProxy {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Proxied> {
        let value = self.target.borrow().get(key).cloned()?;
        Some(self.interceptor.wrap(&value))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.target.borrow().contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.target.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.target.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.borrow().is_empty()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> ActionResult<Proxied> {
        self.mutate(RecordMutation::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Returns whether the property existed.
    pub fn delete(&self, key: impl Into<String>) -> ActionResult<Proxied> {
        self.mutate(RecordMutation::Delete(key.into()))
    }

    pub fn rename(&self, from: impl Into<String>, to: impl Into<String>) -> ActionResult<Proxied> {
        self.mutate(RecordMutation::Rename {
            from: from.into(),
            to: to.into(),
        })
    }
}

// ============================================================================
// Maps and sets
// ============================================================================

impl MapProxy {
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<Proxied> {
        let value = self.target.borrow().get(&EntryKey(key.clone())).cloned()?;
        Some(self.interceptor.wrap(&value))
    }

    /// Read through a path key, as deep addressing does.
    #[must_use]
    pub fn get_key(&self, key: &Key) -> Option<Proxied> {
        self.get(&key.to_value())
    }

    #[must_use]
    pub fn has(&self, key: &Value) -> bool {
        self.target.borrow().contains_key(&EntryKey(key.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.target.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.borrow().is_empty()
    }

    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> ActionResult<Proxied> {
        self.mutate(MapMutation::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn delete(&self, key: impl Into<Value>) -> ActionResult<Proxied> {
        self.mutate(MapMutation::Delete(key.into()))
    }

    pub fn clear(&self) -> ActionResult<Proxied> {
        self.mutate(MapMutation::Clear)
    }
}

impl SetProxy {
    #[must_use]
    pub fn has(&self, member: &Value) -> bool {
        self.target.borrow().contains(&EntryKey(member.clone()))
    }

    /// Every member, re-wrapped.
    #[must_use]
    pub fn members(&self) -> Vec<Proxied> {
        let members: Vec<Value> = self.target.borrow().iter().map(|k| k.value().clone()).collect();
        members.iter().map(|v| self.interceptor.wrap(v)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.target.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.borrow().is_empty()
    }

    pub fn add(&self, member: impl Into<Value>) -> ActionResult<Proxied> {
        self.mutate(SetMutation::Add(member.into()))
    }

    pub fn delete(&self, member: impl Into<Value>) -> ActionResult<Proxied> {
        self.mutate(SetMutation::Delete(member.into()))
    }

    pub fn clear(&self) -> ActionResult<Proxied> {
        self.mutate(SetMutation::Clear)
    }
}

// ============================================================================
// Dates
// ============================================================================

impl DateProxy {
    #[must_use]
    pub fn parts(&self) -> DateParts {
        DateParts::of(&self.target.borrow())
    }

    #[must_use]
    pub fn time(&self) -> i64 {
        epoch_millis(&self.target.borrow())
    }

    pub fn set_full_year(&self, year: i64, month: Option<i64>, day: Option<i64>) -> ActionResult<Proxied> {
        self.mutate(DateMutation::FullYear { year, month, day })
    }

    /// `month` is zero-based.
    pub fn set_month(&self, month: i64, day: Option<i64>) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Month { month, day })
    }

    /// Set the day of the month.
    pub fn set_date(&self, day: i64) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Day(day))
    }

    pub fn set_hours(
        &self,
        hours: i64,
        minutes: Option<i64>,
        seconds: Option<i64>,
        milliseconds: Option<i64>,
    ) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Hours {
            hours,
            minutes,
            seconds,
            milliseconds,
        })
    }

    pub fn set_minutes(
        &self,
        minutes: i64,
        seconds: Option<i64>,
        milliseconds: Option<i64>,
    ) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Minutes {
            minutes,
            seconds,
            milliseconds,
        })
    }

    pub fn set_seconds(&self, seconds: i64, milliseconds: Option<i64>) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Seconds {
            seconds,
            milliseconds,
        })
    }

    pub fn set_milliseconds(&self, milliseconds: i64) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Milliseconds(milliseconds))
    }

    pub fn set_time(&self, millis: i64) -> ActionResult<Proxied> {
        self.mutate(DateMutation::Time(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::Subscription;
    use rewind_core::Operation;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<SharedAction>>>;

    fn recorder(interceptor: &Interceptor) -> (Log, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let sub = interceptor.subscribe(move |action| sink.borrow_mut().push(action.clone()));
        (log, sub)
    }

    #[test]
    fn test_nested_reads_are_intercepted() {
        let interceptor = Interceptor::default();
        let (log, _sub) = recorder(&interceptor);
        let doc = Value::record([("items", Value::array([Value::from(1)]))]);

        let root = interceptor.wrap(&doc);
        let items = root.as_record().unwrap().get("items").unwrap();
        items.as_array().unwrap().push([Value::from(2)]).unwrap();

        assert_eq!(log.borrow().len(), 1);
        log.borrow()[0].undo().unwrap();
        assert_eq!(doc.to_json(), serde_json::json!({"items": [1]}));
    }

    #[test]
    fn test_removed_containers_stay_intercepted() {
        let interceptor = Interceptor::default();
        let (log, _sub) = recorder(&interceptor);
        let first = Value::record([("n", Value::from(1))]);
        let last = Value::record([("n", Value::from(2))]);
        let doc = Value::array([first.clone(), last.clone()]);
        let items = ArrayProxy::new(doc.as_array().unwrap().clone(), interceptor.clone());

        let popped = items.pop().unwrap();
        assert!(popped.target().ptr_eq(&last));
        popped.as_record().unwrap().set("n", 20).unwrap();

        let removed = items.splice(0, Some(1), []).unwrap();
        let removed = removed.as_array().unwrap().get(0).unwrap();
        assert!(removed.target().ptr_eq(&first));
        removed.as_record().unwrap().delete("n").unwrap();

        assert_eq!(log.borrow().len(), 4);
        assert_eq!(last.to_json(), serde_json::json!({"n": 20}));
        for action in log.borrow().iter().rev() {
            action.clone().undo().unwrap();
        }
        assert_eq!(doc.to_json(), serde_json::json!([{"n": 1}, {"n": 2}]));
    }

    #[test]
    fn test_scalar_results_come_back_unwrapped() {
        let interceptor = Interceptor::default();
        let items = ArrayProxy::new(ArrayRef::default(), interceptor);
        let length = items.push([Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(length.as_value(), Some(&Value::from(2usize)));
        let popped = items.pop().unwrap();
        assert_eq!(popped.as_value(), Some(&Value::from(2)));
    }

    #[test]
    fn test_scalars_are_not_wrapped() {
        let interceptor = Interceptor::default();
        let proxied = interceptor.wrap(&Value::from("text"));
        assert_eq!(proxied.as_value(), Some(&Value::from("text")));
        assert!(proxied.as_facade().is_none());
    }

    #[test]
    fn test_escape_hatches() {
        let interceptor = Interceptor::default();
        let doc = Value::array([]);
        let proxied = interceptor.wrap(&doc);
        let proxy = proxied.as_array().unwrap();

        assert!(proxy.target().ptr_eq(&doc));
        assert!(proxy.interceptor().ptr_eq(&interceptor));
        assert_eq!(proxy.kind(), ContainerKind::Array);
        assert_eq!(proxy.handler().name(), "ArrayHandler");
    }

    #[test]
    fn test_record_map_set_date_proxies() {
        let interceptor = Interceptor::default();
        let (log, _sub) = recorder(&interceptor);

        let record = RecordProxy::new(RecordRef::default(), interceptor.clone());
        record.set("a", 1).unwrap();
        record.rename("a", "b").unwrap();
        assert_eq!(record.keys(), vec!["b".to_owned()]);

        let map = MapProxy::new(MapRef::default(), interceptor.clone());
        map.set(1, "one").unwrap();
        assert!(map.has(&Value::from(1)));
        assert!(map.get_key(&Key::Index(1)).is_some());

        let set = SetProxy::new(SetRef::default(), interceptor.clone());
        set.add("x").unwrap();
        assert!(set.has(&Value::from("x")));

        let date = DateProxy::new(
            DateRef::new(rewind_core::container::date::from_epoch_millis(0).unwrap()),
            interceptor.clone(),
        );
        date.set_time(1_000).unwrap();
        assert_eq!(date.time(), 1_000);

        assert_eq!(log.borrow().len(), 5);
        for action in log.borrow().iter().rev() {
            action.clone().undo().unwrap();
        }
        assert!(record.is_empty());
        assert!(map.is_empty());
        assert!(set.is_empty());
        assert_eq!(date.time(), 0);
    }

    #[test]
    fn test_submit_custom_action() {
        let interceptor = Interceptor::default();
        let (log, _sub) = recorder(&interceptor);
        let items = ArrayProxy::new(ArrayRef::default(), interceptor.clone());
        let push = rewind_core::container::array::Push::new(items.handle(), vec![Value::from(1)]);
        let action = SharedAction::new(push.into_action());
        items.submit(action).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_sort_by_comparator() {
        let interceptor = Interceptor::default();
        let items = ArrayProxy::new(
            ArrayRef::new(vec![Value::from(1), Value::from(3), Value::from(2)]),
            interceptor,
        );
        items.sort_by(|a, b| b.compare(a)).unwrap();
        assert_eq!(Value::Array(items.handle().clone()).to_json(), serde_json::json!([3, 2, 1]));
    }
}
