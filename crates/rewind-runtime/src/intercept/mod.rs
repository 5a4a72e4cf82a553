#![forbid(unsafe_code)]

//! Mutation interception.
//!
//! # Design
//!
//! An [`Interceptor`] is the shared context behind every proxy: the handler
//! registry, a per-kind cache of handler instances, and the listener list.
//! Cloning an interceptor yields a new handle to the **same** context, so
//! proxies handed out by reads share listeners with the proxy they came
//! from.
//!
//! ```text
//! proxy.push(x)
//!   -> handler_for(Array).intercept(target, Push([x]))
//!        Ok(action)    -> notify listeners(action) -> action.apply()
//!        Err(request)  -> request performed directly, nobody notified
//! ```
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. Notification happens before the mutation is applied.
//! 3. Handlers are created at most once per kind per interceptor.
//! 4. Dead listeners (dropped [`Subscription`] guards) are pruned lazily.
//!
//! # Failure Modes
//!
//! - **Re-entrant mutation**: mutating the same container from inside a
//!   listener runs while the outer action has not been applied yet; the
//!   outer action then captures the listener's effects as its pre-state.
//! - **Subscriber leak**: guards stored indefinitely keep their listeners
//!   alive.

pub mod handler;
pub mod proxy;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rewind_core::{ActionError, ActionResult, ContainerKind, Mutation, SharedAction, Value};
use tracing::{debug, debug_span};

pub use handler::{
    ArrayHandler, DateHandler, Handler, HandlerRegistry, MapHandler, PassThroughHandler,
    RecordHandler, SetHandler,
};
pub use proxy::{ArrayProxy, DateProxy, Facade, MapProxy, Proxied, RecordProxy, SetProxy};

type ListenerRc = Rc<dyn Fn(&SharedAction)>;
type ListenerWeak = Weak<dyn Fn(&SharedAction)>;

struct InterceptorInner {
    registry: HandlerRegistry,
    handlers: RefCell<HashMap<ContainerKind, Rc<dyn Handler>>>,
    /// Listeners stored as weak references. Dead entries are pruned on notify.
    listeners: RefCell<Vec<ListenerWeak>>,
}

/// Shared interception context.
#[derive(Clone)]
pub struct Interceptor {
    inner: Rc<InterceptorInner>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("registry", &self.inner.registry)
            .field("cached_handlers", &self.inner.handlers.borrow().len())
            .field("listener_count", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::new(HandlerRegistry::with_defaults())
    }
}

impl Interceptor {
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            inner: Rc::new(InterceptorInner {
                registry,
                handlers: RefCell::new(HashMap::new()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Whether both handles share one context.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    /// Wrap `value` in the proxy for its kind. Scalars come back as
    /// [`Proxied::Value`].
    #[must_use]
    pub fn wrap(&self, value: &Value) -> Proxied {
        Proxied::new(value.clone(), self.clone())
    }

    /// Handler for `kind`, created on first use and cached.
    #[must_use]
    pub fn handler_for(&self, kind: ContainerKind) -> Rc<dyn Handler> {
        if let Some(handler) = self.inner.handlers.borrow().get(&kind) {
            return handler.clone();
        }
        let handler = self.inner.registry.resolve(kind);
        debug!(kind = kind.name(), handler = handler.name(), "handler created");
        self.inner
            .handlers
            .borrow_mut()
            .insert(kind, handler.clone());
        handler
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener for every intercepted action.
    ///
    /// Dropping the returned guard unsubscribes the listener.
    pub fn subscribe(&self, listener: impl Fn(&SharedAction) + 'static) -> Subscription {
        let strong: ListenerRc = Rc::new(listener);
        self.inner.listeners.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of registered listeners (including dead ones not yet pruned).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Notify live listeners and prune dead ones.
    pub fn notify(&self, action: &SharedAction) {
        // Collect first so listeners may subscribe while being notified.
        let listeners: Vec<ListenerRc> = {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners.retain(|w| w.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        if listeners.is_empty() {
            return;
        }
        let _span = debug_span!(
            "rewind.notify",
            action = action.description(),
            listeners = listeners.len()
        )
        .entered();
        for listener in &listeners {
            listener(action);
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Notify listeners of `action`, then apply it.
    pub fn submit(&self, action: SharedAction) -> ActionResult<Value> {
        self.notify(&action);
        action.apply()
    }

    /// Route `mutation` on `target` through the handler for its kind.
    pub fn intercept(&self, target: &Value, mutation: impl Into<Mutation>) -> ActionResult<Value> {
        let mutation = mutation.into();
        let Some(kind) = target.container_kind() else {
            return Err(ActionError::KindMismatch {
                expected: mutation.kind().name(),
                found: target.kind_name(),
            });
        };
        match self.handler_for(kind).intercept(target, mutation) {
            Ok(action) => self.submit(action),
            Err(mutation) => {
                debug!(kind = kind.name(), method = mutation.name(), "not intercepted");
                mutation.perform_direct(target)
            }
        }
    }
}

/// RAII guard for a listener.
///
/// Dropping the guard drops the only strong reference to the listener, so
/// the weak entry in the interceptor stops upgrading.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::{ArrayMutation, RecordMutation};
    use std::cell::Cell;

    #[test]
    fn test_listener_sees_action_before_apply() {
        let interceptor = Interceptor::default();
        let items = Value::array([Value::from(1)]);
        let seen_len = Rc::new(Cell::new(usize::MAX));

        let probe = items.clone();
        let seen = seen_len.clone();
        let _sub = interceptor.subscribe(move |action| {
            assert_eq!(action.description(), "Push 1 item");
            seen.set(probe.as_array().map_or(0, |a| a.len()));
        });

        let len = interceptor
            .intercept(&items, ArrayMutation::Push(vec![Value::from(2)]))
            .unwrap();
        assert_eq!(len, Value::from(2usize));
        assert_eq!(seen_len.get(), 1);
    }

    #[test]
    fn test_dropped_subscription_stops_notifications() {
        let interceptor = Interceptor::default();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let sub = interceptor.subscribe(move |_| counter.set(counter.get() + 1));

        let items = Value::array([]);
        interceptor.intercept(&items, ArrayMutation::Reverse).unwrap();
        drop(sub);
        interceptor.intercept(&items, ArrayMutation::Reverse).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(interceptor.listener_count(), 0);
    }

    #[test]
    fn test_handlers_cached_per_kind() {
        let interceptor = Interceptor::default();
        let a = interceptor.handler_for(ContainerKind::Array);
        let b = interceptor.handler_for(ContainerKind::Array);
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_pass_through_performs_without_notifying() {
        let interceptor = Interceptor::new(HandlerRegistry::new());
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let _sub = interceptor.subscribe(move |_| counter.set(counter.get() + 1));

        let record = Value::record([("a", Value::from(1))]);
        interceptor
            .intercept(&record, RecordMutation::Delete("a".into()))
            .unwrap();
        assert_eq!(count.get(), 0);
        assert!(!record.has(&"a".into()));
    }

    #[test]
    fn test_scalar_target_is_kind_mismatch() {
        let interceptor = Interceptor::default();
        let err = interceptor
            .intercept(&Value::from(1), ArrayMutation::Pop)
            .unwrap_err();
        assert!(matches!(err, ActionError::KindMismatch { found: "number", .. }));
    }

    #[test]
    fn test_clone_shares_context() {
        let interceptor = Interceptor::default();
        let other = interceptor.clone();
        let _sub = other.subscribe(|_| {});
        assert_eq!(interceptor.listener_count(), 1);
        assert!(interceptor.ptr_eq(&other));
    }
}
