#![forbid(unsafe_code)]

//! Setter-style operations.
//!
//! Some targets are only reachable through setter/getter pairs whose fields
//! interact (setting a date's month can roll its day over). For those, the
//! reversal state is the tuple the getters observe before the mutation, and
//! undo replays the setters with that tuple.

use std::fmt;

use crate::action::Operation;
use crate::error::ActionResult;
use crate::value::Value;

type Getter<S> = Box<dyn Fn() -> S>;
type Setter = Box<dyn FnMut() -> ActionResult<Value>>;
type Restore<S> = Box<dyn Fn(&S) -> ActionResult>;

/// Operation performed through a bound setter and reversed by replaying
/// captured getter state.
pub struct SetViaFunction<S> {
    label: String,
    getter: Getter<S>,
    setter: Setter,
    restore: Restore<S>,
    captured: Option<S>,
}

impl<S: 'static> SetViaFunction<S> {
    /// Build the operation from its three closures.
    ///
    /// `getter` captures the observable state, `setter` performs the bound
    /// mutation, `restore` replays the setters with a captured tuple.
    pub fn new(
        label: impl Into<String>,
        getter: impl Fn() -> S + 'static,
        setter: impl FnMut() -> ActionResult<Value> + 'static,
        restore: impl Fn(&S) -> ActionResult + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            getter: Box::new(getter),
            setter: Box::new(setter),
            restore: Box::new(restore),
            captured: None,
        }
    }

    /// The state captured before the first mutation.
    #[must_use]
    pub fn captured(&self) -> Option<&S> {
        self.captured.as_ref()
    }
}

impl<S: 'static> Operation for SetViaFunction<S> {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn initialize(&mut self) {
        self.captured = Some((self.getter)());
    }

    fn perform(&mut self) -> ActionResult<Value> {
        (self.setter)()
    }

    fn revert(&mut self) -> ActionResult {
        match &self.captured {
            Some(state) => (self.restore)(state),
            None => Ok(()),
        }
    }

    fn debug_name(&self) -> &'static str {
        "SetViaFunction"
    }
}

impl<S: fmt::Debug> fmt::Debug for SetViaFunction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetViaFunction")
            .field("label", &self.label)
            .field("captured", &self.captured)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Width and height where setting the width keeps the aspect ratio.
    #[test]
    fn test_restores_interacting_fields() {
        let size = Rc::new(Cell::new((4, 2)));
        let (get, set, restore) = (size.clone(), size.clone(), size.clone());
        let mut action = SetViaFunction::new(
            "Set width",
            move || get.get(),
            move || {
                let (w, h) = set.get();
                set.set((8, h * 8 / w));
                Ok(Value::from(8))
            },
            move |captured: &(i32, i32)| {
                restore.set(*captured);
                Ok(())
            },
        )
        .into_action();

        action.apply().unwrap();
        assert_eq!(size.get(), (8, 4));
        action.undo().unwrap();
        assert_eq!(size.get(), (4, 2));
        assert_eq!(action.operation().captured(), Some(&(4, 2)));
    }
}
