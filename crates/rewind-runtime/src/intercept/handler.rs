#![forbid(unsafe_code)]

//! Interception handlers and the per-kind registry.
//!
//! A [`Handler`] turns a mutation request into an observable action. The
//! [`HandlerRegistry`] maps container kinds to handler factories; lookup
//! walks the kind fallback chain (every kind falls back to `Record`) and
//! ends at [`PassThroughHandler`], which observes nothing.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rewind_core::{ContainerKind, Mutation, SharedAction, Value};

/// Produces actions for intercepted mutations.
pub trait Handler {
    /// Build the action for `mutation` on `target`.
    ///
    /// `Err` hands the request back: it is then performed directly and no
    /// listener is notified.
    fn intercept(&self, target: &Value, mutation: Mutation) -> Result<SharedAction, Mutation>;

    fn name(&self) -> &'static str;
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observe `mutation` when it is a request of kind `kind`.
fn observe(kind: ContainerKind, target: &Value, mutation: Mutation) -> Result<SharedAction, Mutation> {
    if mutation.kind() != kind {
        return Err(mutation);
    }
    match mutation.clone().into_action(target) {
        Some(action) => Ok(SharedAction::from_boxed(action)),
        None => Err(mutation),
    }
}

macro_rules! kind_handler {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Handler for $name {
            fn intercept(
                &self,
                target: &Value,
                mutation: Mutation,
            ) -> Result<SharedAction, Mutation> {
                observe($kind, target, mutation)
            }

            fn name(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

kind_handler!(
    /// Observes array mutations.
    ArrayHandler,
    ContainerKind::Array
);
kind_handler!(
    /// Observes record property mutations.
    RecordHandler,
    ContainerKind::Record
);
kind_handler!(
    /// Observes map mutations.
    MapHandler,
    ContainerKind::Map
);
kind_handler!(
    /// Observes set mutations.
    SetHandler,
    ContainerKind::Set
);
kind_handler!(
    /// Observes date setter calls.
    DateHandler,
    ContainerKind::Date
);

/// Observes nothing; every request is performed directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughHandler;

impl Handler for PassThroughHandler {
    fn intercept(&self, _target: &Value, mutation: Mutation) -> Result<SharedAction, Mutation> {
        Err(mutation)
    }

    fn name(&self) -> &'static str {
        "PassThroughHandler"
    }
}

type HandlerFactory = Rc<dyn Fn() -> Rc<dyn Handler>>;

/// Handler factories by container kind.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<ContainerKind, HandlerFactory>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&'static str> = self.factories.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl HandlerRegistry {
    /// Empty registry: everything resolves to [`PassThroughHandler`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handler for every kind.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ContainerKind::Array, || Rc::new(ArrayHandler));
        registry.register(ContainerKind::Record, || Rc::new(RecordHandler));
        registry.register(ContainerKind::Map, || Rc::new(MapHandler));
        registry.register(ContainerKind::Set, || Rc::new(SetHandler));
        registry.register(ContainerKind::Date, || Rc::new(DateHandler));
        registry
    }

    /// Register (or replace) the handler factory for `kind`.
    pub fn register(&mut self, kind: ContainerKind, factory: impl Fn() -> Rc<dyn Handler> + 'static) {
        self.factories.insert(kind, Rc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_handler(
        mut self,
        kind: ContainerKind,
        factory: impl Fn() -> Rc<dyn Handler> + 'static,
    ) -> Self {
        self.register(kind, factory);
        self
    }

    /// Remove the factory for `kind`, so lookups fall back to its parent.
    pub fn unregister(&mut self, kind: ContainerKind) -> bool {
        self.factories.remove(&kind).is_some()
    }

    #[must_use]
    pub fn contains(&self, kind: ContainerKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// New handler for `kind`, walking the fallback chain.
    #[must_use]
    pub fn resolve(&self, kind: ContainerKind) -> Rc<dyn Handler> {
        let mut current = Some(kind);
        while let Some(kind) = current {
            if let Some(factory) = self.factories.get(&kind) {
                return factory();
            }
            current = kind.parent();
        }
        Rc::new(PassThroughHandler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::{ArrayMutation, MapMutation};

    #[test]
    fn test_defaults_resolve_by_kind() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(registry.resolve(ContainerKind::Array).name(), "ArrayHandler");
        assert_eq!(registry.resolve(ContainerKind::Date).name(), "DateHandler");
    }

    #[test]
    fn test_resolution_falls_back_to_record_then_pass_through() {
        let mut registry = HandlerRegistry::with_defaults();
        assert!(registry.unregister(ContainerKind::Map));
        assert_eq!(registry.resolve(ContainerKind::Map).name(), "RecordHandler");
        registry.unregister(ContainerKind::Record);
        assert_eq!(registry.resolve(ContainerKind::Map).name(), "PassThroughHandler");
        assert!(!registry.contains(ContainerKind::Record));
    }

    #[test]
    fn test_handler_rejects_other_kinds() {
        let target = Value::array([Value::from(1)]);
        let handled = ArrayHandler.intercept(&target, Mutation::Array(ArrayMutation::Pop));
        assert!(handled.is_ok());

        let rejected = ArrayHandler.intercept(&target, Mutation::Map(MapMutation::Clear));
        assert!(matches!(rejected, Err(Mutation::Map(MapMutation::Clear))));

        // Right request kind, wrong target kind.
        let rejected = MapHandler.intercept(&target, Mutation::Map(MapMutation::Clear));
        assert!(rejected.is_err());
    }

    #[test]
    fn test_pass_through_never_observes() {
        let target = Value::array([]);
        let result = PassThroughHandler.intercept(&target, ArrayMutation::Reverse.into());
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_handler_replaces_default() {
        let registry = HandlerRegistry::with_defaults()
            .with_handler(ContainerKind::Array, || Rc::new(PassThroughHandler));
        assert_eq!(registry.resolve(ContainerKind::Array).name(), "PassThroughHandler");
    }
}
