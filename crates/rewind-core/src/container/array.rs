#![forbid(unsafe_code)]

//! Reversible array operations.
//!
//! Each operation captures only what its mutation destroys:
//!
//! | Operation     | Captured                              |
//! |---------------|---------------------------------------|
//! | `Resize`      | original length, truncated tail       |
//! | `Splice`      | normalized start, removed slice       |
//! | `SetIndex`    | previous value, previous length       |
//! | `Push`/`Unshift` | nothing beyond the item count      |
//! | `Pop`/`Shift` | removed value                         |
//! | `CopyWithin`/`Fill` | overwritten range               |
//! | `Sort`        | original ordering                     |
//! | `Reverse`     | nothing (self-inverse)                |
//! | `MoveElement` | resolved insert index                 |
//!
//! Signed `start`/`end` arguments count from the end when negative and are
//! clamped to `[0, len]`. Every index is re-clamped at mutation time so
//! out-of-band changes never panic.
//!
//! Writes past the end pad with `Null`, but never by more than
//! [`MAX_ARRAY_GAP`] slots; a farther write fails with
//! [`ActionError::IndexOutOfRange`] and leaves the array untouched.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::action::{Action, Operation};
use crate::error::{ActionError, ActionResult};
use crate::key::ArraySlot;
use crate::value::{ArrayRef, Value};

/// Comparator for [`Sort`].
#[derive(Clone)]
pub struct Comparator(Rc<dyn Fn(&Value, &Value) -> Ordering>);

impl Comparator {
    pub fn new(compare: impl Fn(&Value, &Value) -> Ordering + 'static) -> Self {
        Self(Rc::new(compare))
    }

    #[must_use]
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        (self.0)(a, b)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator")
    }
}

/// Most `Null` slots a single write may pad past the end of an array.
pub const MAX_ARRAY_GAP: usize = 1 << 16;

/// Whether a write at `index` is within padding reach of an array of `len`.
#[must_use]
pub const fn within_reach(index: usize, len: usize) -> bool {
    index <= len.saturating_add(MAX_ARRAY_GAP)
}

/// Length an array of `len` grows to when written at `index`.
fn grown_length(index: usize, len: usize) -> ActionResult<usize> {
    index
        .checked_add(1)
        .filter(|_| within_reach(index, len))
        .ok_or(ActionError::IndexOutOfRange { index, len })
}

/// Resolve a relative index against `len`.
fn relative(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        index.unsigned_abs().min(len)
    }
}

/// Clamp `start..start + count` into `0..len`.
fn clamped(start: usize, count: usize, len: usize) -> std::ops::Range<usize> {
    let start = start.min(len);
    start..start.saturating_add(count).min(len)
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

// ============================================================================
// Request enum
// ============================================================================

/// A mutating array request, as issued through an array proxy.
#[derive(Debug, Clone)]
pub enum ArrayMutation {
    SetLength(usize),
    SetIndex { index: usize, value: Value },
    Push(Vec<Value>),
    Pop,
    Shift,
    Unshift(Vec<Value>),
    Splice {
        start: isize,
        delete_count: Option<usize>,
        items: Vec<Value>,
    },
    CopyWithin {
        target: isize,
        start: isize,
        end: Option<isize>,
    },
    Fill {
        value: Value,
        start: isize,
        end: Option<isize>,
    },
    Sort(Option<Comparator>),
    Reverse,
}

impl ArrayMutation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetLength(_) => "set_len",
            Self::SetIndex { .. } => "set",
            Self::Push(_) => "push",
            Self::Pop => "pop",
            Self::Shift => "shift",
            Self::Unshift(_) => "unshift",
            Self::Splice { .. } => "splice",
            Self::CopyWithin { .. } => "copy_within",
            Self::Fill { .. } => "fill",
            Self::Sort(_) => "sort",
            Self::Reverse => "reverse",
        }
    }

    /// Build the reversible action for this request against `target`.
    #[must_use]
    pub fn into_action(self, target: &ArrayRef) -> Box<dyn Action> {
        match self {
            Self::SetLength(length) => Box::new(Resize::new(target, length).into_action()),
            Self::SetIndex { index, value } => {
                Box::new(SetIndex::new(target, index, value).into_action())
            }
            Self::Push(items) => Box::new(Push::new(target, items).into_action()),
            Self::Pop => Box::new(Pop::new(target).into_action()),
            Self::Shift => Box::new(Shift::new(target).into_action()),
            Self::Unshift(items) => Box::new(Unshift::new(target, items).into_action()),
            Self::Splice {
                start,
                delete_count,
                items,
            } => Box::new(Splice::new(target, start, delete_count, items).into_action()),
            Self::CopyWithin { target: to, start, end } => {
                Box::new(CopyWithin::new(target, to, start, end).into_action())
            }
            Self::Fill { value, start, end } => {
                Box::new(Fill::new(target, value, start, end).into_action())
            }
            Self::Sort(comparator) => Box::new(Sort::new(target, comparator).into_action()),
            Self::Reverse => Box::new(Reverse::new(target).into_action()),
        }
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Set the array length, padding with `Null` or truncating.
#[derive(Debug)]
pub struct Resize {
    target: ArrayRef,
    length: usize,
    original_length: usize,
    truncated: Vec<Value>,
}

impl Resize {
    #[must_use]
    pub fn new(target: &ArrayRef, length: usize) -> Self {
        Self {
            target: target.clone(),
            length,
            original_length: 0,
            truncated: Vec::new(),
        }
    }
}

impl Operation for Resize {
    fn describe(&self) -> String {
        format!("Set length to {}", self.length)
    }

    fn initialize(&mut self) {
        let items = self.target.borrow();
        self.original_length = items.len();
        self.truncated = items.get(self.length..).map(<[Value]>::to_vec).unwrap_or_default();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        if self.length > items.len() && !within_reach(self.length - 1, items.len()) {
            return Err(ActionError::IndexOutOfRange {
                index: self.length - 1,
                len: items.len(),
            });
        }
        items.resize(self.length, Value::Null);
        Ok(Value::from(self.length))
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.target.borrow_mut();
        items.truncate(self.length.min(self.original_length));
        items.extend(self.truncated.iter().cloned());
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Resize"
    }
}

// ============================================================================
// SetIndex
// ============================================================================

/// Overwrite one element, padding with `Null` when past the end.
#[derive(Debug)]
pub struct SetIndex {
    target: ArrayRef,
    index: usize,
    value: Value,
    previous: Option<Value>,
    previous_length: usize,
}

impl SetIndex {
    #[must_use]
    pub fn new(target: &ArrayRef, index: usize, value: Value) -> Self {
        Self {
            target: target.clone(),
            index,
            value,
            previous: None,
            previous_length: 0,
        }
    }
}

impl Operation for SetIndex {
    fn describe(&self) -> String {
        format!("Set index {}", self.index)
    }

    fn initialize(&mut self) {
        let items = self.target.borrow();
        self.previous_length = items.len();
        self.previous = items.get(self.index).cloned();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        if self.index >= items.len() {
            let length = grown_length(self.index, items.len())?;
            items.resize(length, Value::Null);
        }
        if let Some(slot) = items.get_mut(self.index) {
            *slot = self.value.clone();
        }
        Ok(self.value.clone())
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.target.borrow_mut();
        if self.index < self.previous_length {
            if let (Some(previous), Some(slot)) = (&self.previous, items.get_mut(self.index)) {
                *slot = previous.clone();
            }
        } else {
            items.truncate(self.previous_length);
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "SetIndex"
    }
}

// ============================================================================
// Push / Unshift
// ============================================================================

/// Append items; returns the new length.
#[derive(Debug)]
pub struct Push {
    target: ArrayRef,
    items: Vec<Value>,
}

impl Push {
    #[must_use]
    pub fn new(target: &ArrayRef, items: Vec<Value>) -> Self {
        Self {
            target: target.clone(),
            items,
        }
    }
}

impl Operation for Push {
    fn describe(&self) -> String {
        format!("Push {} item{}", self.items.len(), plural(self.items.len()))
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        items.extend(self.items.iter().cloned());
        Ok(Value::from(items.len()))
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.target.borrow_mut();
        let keep = items.len().saturating_sub(self.items.len());
        items.truncate(keep);
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Push"
    }
}

/// Prepend items; returns the new length.
#[derive(Debug)]
pub struct Unshift {
    target: ArrayRef,
    items: Vec<Value>,
}

impl Unshift {
    #[must_use]
    pub fn new(target: &ArrayRef, items: Vec<Value>) -> Self {
        Self {
            target: target.clone(),
            items,
        }
    }
}

impl Operation for Unshift {
    fn describe(&self) -> String {
        format!("Unshift {} item{}", self.items.len(), plural(self.items.len()))
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        items.splice(0..0, self.items.iter().cloned());
        Ok(Value::from(items.len()))
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.target.borrow_mut();
        let count = self.items.len().min(items.len());
        items.drain(..count);
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Unshift"
    }
}

// ============================================================================
// Pop / Shift
// ============================================================================

/// Remove the last element; returns it, or `Null` when empty.
#[derive(Debug)]
pub struct Pop {
    target: ArrayRef,
    removed: Option<Value>,
}

impl Pop {
    #[must_use]
    pub fn new(target: &ArrayRef) -> Self {
        Self {
            target: target.clone(),
            removed: None,
        }
    }
}

impl Operation for Pop {
    fn describe(&self) -> String {
        "Pop".to_owned()
    }

    fn initialize(&mut self) {
        self.removed = self.target.borrow().last().cloned();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        Ok(self.target.borrow_mut().pop().unwrap_or_default())
    }

    fn revert(&mut self) -> ActionResult {
        if let Some(removed) = &self.removed {
            self.target.borrow_mut().push(removed.clone());
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Pop"
    }
}

/// Remove the first element; returns it, or `Null` when empty.
#[derive(Debug)]
pub struct Shift {
    target: ArrayRef,
    removed: Option<Value>,
}

impl Shift {
    #[must_use]
    pub fn new(target: &ArrayRef) -> Self {
        Self {
            target: target.clone(),
            removed: None,
        }
    }
}

impl Operation for Shift {
    fn describe(&self) -> String {
        "Shift".to_owned()
    }

    fn initialize(&mut self) {
        self.removed = self.target.borrow().first().cloned();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        if items.is_empty() {
            return Ok(Value::Null);
        }
        Ok(items.remove(0))
    }

    fn revert(&mut self) -> ActionResult {
        if let Some(removed) = &self.removed {
            self.target.borrow_mut().insert(0, removed.clone());
        }
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Shift"
    }
}

// ============================================================================
// Splice
// ============================================================================

/// Remove `delete_count` elements at `start` and insert `items` there.
///
/// Returns a new array holding the removed elements.
#[derive(Debug)]
pub struct Splice {
    target: ArrayRef,
    start: isize,
    delete_count: Option<usize>,
    items: Vec<Value>,
    resolved_start: usize,
    removed: Vec<Value>,
}

impl Splice {
    #[must_use]
    pub fn new(
        target: &ArrayRef,
        start: isize,
        delete_count: Option<usize>,
        items: Vec<Value>,
    ) -> Self {
        Self {
            target: target.clone(),
            start,
            delete_count,
            items,
            resolved_start: 0,
            removed: Vec::new(),
        }
    }
}

impl Operation for Splice {
    fn describe(&self) -> String {
        match self.delete_count {
            Some(count) => format!(
                "Splice {} out, {} in at {}",
                count,
                self.items.len(),
                self.start
            ),
            None => format!("Splice tail at {}, {} in", self.start, self.items.len()),
        }
    }

    fn initialize(&mut self) {
        let items = self.target.borrow();
        let len = items.len();
        let start = relative(self.start, len);
        let count = self.delete_count.unwrap_or(len - start).min(len - start);
        self.resolved_start = start;
        self.removed = items[start..start + count].to_vec();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        let range = clamped(self.resolved_start, self.removed.len(), items.len());
        let removed: Vec<Value> = items.splice(range, self.items.iter().cloned()).collect();
        Ok(Value::array(removed))
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.target.borrow_mut();
        let range = clamped(self.resolved_start, self.items.len(), items.len());
        items.splice(range, self.removed.iter().cloned());
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Splice"
    }
}

// ============================================================================
// CopyWithin / Fill
// ============================================================================

/// Copy `start..end` over the range beginning at `target`.
#[derive(Debug)]
pub struct CopyWithin {
    array: ArrayRef,
    target: isize,
    start: isize,
    end: Option<isize>,
    to: usize,
    from: usize,
    overwritten: Vec<Value>,
}

impl CopyWithin {
    #[must_use]
    pub fn new(array: &ArrayRef, target: isize, start: isize, end: Option<isize>) -> Self {
        Self {
            array: array.clone(),
            target,
            start,
            end,
            to: 0,
            from: 0,
            overwritten: Vec::new(),
        }
    }
}

impl Operation for CopyWithin {
    fn describe(&self) -> String {
        format!("Copy within to {}", self.target)
    }

    fn initialize(&mut self) {
        let items = self.array.borrow();
        let len = items.len();
        self.to = relative(self.target, len);
        self.from = relative(self.start, len);
        let end = self.end.map_or(len, |end| relative(end, len));
        let count = end.saturating_sub(self.from).min(len - self.to);
        self.overwritten = items[self.to..self.to + count].to_vec();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.array.borrow_mut();
        let len = items.len();
        let source = clamped(self.from, self.overwritten.len(), len);
        let dest = clamped(self.to, source.len(), len);
        let copied: Vec<Value> = items[source][..dest.len()].to_vec();
        items[dest].clone_from_slice(&copied);
        Ok(Value::Array(self.array.clone()))
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.array.borrow_mut();
        let range = clamped(self.to, self.overwritten.len(), items.len());
        items.splice(range, self.overwritten.iter().cloned());
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "CopyWithin"
    }
}

/// Overwrite `start..end` with clones of `value`.
#[derive(Debug)]
pub struct Fill {
    target: ArrayRef,
    value: Value,
    start: isize,
    end: Option<isize>,
    from: usize,
    overwritten: Vec<Value>,
}

impl Fill {
    #[must_use]
    pub fn new(target: &ArrayRef, value: Value, start: isize, end: Option<isize>) -> Self {
        Self {
            target: target.clone(),
            value,
            start,
            end,
            from: 0,
            overwritten: Vec::new(),
        }
    }
}

impl Operation for Fill {
    fn describe(&self) -> String {
        format!("Fill from {}", self.start)
    }

    fn initialize(&mut self) {
        let items = self.target.borrow();
        let len = items.len();
        self.from = relative(self.start, len);
        let end = self.end.map_or(len, |end| relative(end, len));
        self.overwritten = items[self.from..end.max(self.from)].to_vec();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        let range = clamped(self.from, self.overwritten.len(), items.len());
        for slot in &mut items[range] {
            *slot = self.value.clone();
        }
        Ok(Value::Array(self.target.clone()))
    }

    fn revert(&mut self) -> ActionResult {
        let mut items = self.target.borrow_mut();
        let range = clamped(self.from, self.overwritten.len(), items.len());
        items.splice(range, self.overwritten.iter().cloned());
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Fill"
    }
}

// ============================================================================
// Sort / Reverse
// ============================================================================

/// Stable sort, by [`Value::compare`] unless a comparator is given.
#[derive(Debug)]
pub struct Sort {
    target: ArrayRef,
    comparator: Option<Comparator>,
    snapshot: Vec<Value>,
}

impl Sort {
    #[must_use]
    pub fn new(target: &ArrayRef, comparator: Option<Comparator>) -> Self {
        Self {
            target: target.clone(),
            comparator,
            snapshot: Vec::new(),
        }
    }
}

impl Operation for Sort {
    fn describe(&self) -> String {
        "Sort".to_owned()
    }

    fn initialize(&mut self) {
        self.snapshot = self.target.borrow().clone();
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let mut items = self.target.borrow_mut();
        match &self.comparator {
            Some(comparator) => items.sort_by(|a, b| comparator.compare(a, b)),
            None => items.sort_by(Value::compare),
        }
        Ok(Value::Array(self.target.clone()))
    }

    fn revert(&mut self) -> ActionResult {
        self.target.borrow_mut().clone_from(&self.snapshot);
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Sort"
    }
}

/// Reverse the element order.
#[derive(Debug)]
pub struct Reverse {
    target: ArrayRef,
}

impl Reverse {
    #[must_use]
    pub fn new(target: &ArrayRef) -> Self {
        Self {
            target: target.clone(),
        }
    }
}

impl Operation for Reverse {
    fn describe(&self) -> String {
        "Reverse".to_owned()
    }

    fn perform(&mut self) -> ActionResult<Value> {
        self.target.borrow_mut().reverse();
        Ok(Value::Array(self.target.clone()))
    }

    fn revert(&mut self) -> ActionResult {
        self.target.borrow_mut().reverse();
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "Reverse"
    }
}

// ============================================================================
// MoveElement
// ============================================================================

/// Remove the element at `from` in `source` and insert it into `dest`.
///
/// `source` and `dest` may be the same array; the insert slot is then
/// interpreted after the removal. Returns the moved value, or `Null` when
/// `from` is out of bounds.
#[derive(Debug)]
pub struct MoveElement {
    source: ArrayRef,
    from: usize,
    dest: ArrayRef,
    to: ArraySlot,
    inserted_at: Option<usize>,
}

impl MoveElement {
    #[must_use]
    pub fn new(source: &ArrayRef, from: usize, dest: &ArrayRef, to: ArraySlot) -> Self {
        Self {
            source: source.clone(),
            from,
            dest: dest.clone(),
            to,
            inserted_at: None,
        }
    }
}

impl Operation for MoveElement {
    fn describe(&self) -> String {
        match self.to {
            ArraySlot::At(index) => format!("Move element {} to {}", self.from, index),
            ArraySlot::Append => format!("Move element {} to end", self.from),
        }
    }

    fn perform(&mut self) -> ActionResult<Value> {
        let value = {
            let mut source = self.source.borrow_mut();
            if self.from >= source.len() {
                self.inserted_at = None;
                return Ok(Value::Null);
            }
            source.remove(self.from)
        };
        let mut dest = self.dest.borrow_mut();
        let index = self.to.resolve(dest.len()).min(dest.len());
        dest.insert(index, value.clone());
        self.inserted_at = Some(index);
        Ok(value)
    }

    fn revert(&mut self) -> ActionResult {
        let Some(index) = self.inserted_at else {
            return Ok(());
        };
        let value = {
            let mut dest = self.dest.borrow_mut();
            if index >= dest.len() {
                return Ok(());
            }
            dest.remove(index)
        };
        let mut source = self.source.borrow_mut();
        let at = self.from.min(source.len());
        source.insert(at, value);
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "MoveElement"
    }
}

// ============================================================================
// Tests
// ============================================================================
