#![forbid(unsafe_code)]

//! Rewind Runtime
//!
//! Observes ordinary container mutations and records them for undo.
//!
//! # Key Components
//!
//! - [`Interceptor`] - Shared interception context: handlers, cache, listeners
//! - [`Handler`] / [`HandlerRegistry`] - Per-kind mutation observers
//! - [`Proxied`] - Intercepting views over arrays, records, maps, sets and dates
//! - [`Facade`] - Escape hatches back to the raw target and its context
//! - [`Subscription`] - RAII guard for a mutation listener
//! - [`HistoryTrack`] - Bounded linear undo/redo over recorded actions
//!
//! # Role in Rewind
//! `rewind-runtime` sits between application code and `rewind-core`. Code
//! mutates containers through proxies; each mutation becomes a
//! `rewind-core` action, listeners hear about it before it runs, and a
//! [`HistoryTrack`] attached as a listener keeps it for undo.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use rewind_core::Value;
//! use rewind_runtime::{HistoryTrack, Interceptor};
//!
//! let interceptor = Interceptor::default();
//! let track = Rc::new(RefCell::new(HistoryTrack::default()));
//! let _recording = HistoryTrack::attach(&track, &interceptor);
//!
//! let doc = Value::array([Value::from(1)]);
//! let proxied = interceptor.wrap(&doc);
//! proxied.as_array().unwrap().push([Value::from(2)]).unwrap();
//! assert_eq!(doc.to_json(), serde_json::json!([1, 2]));
//!
//! track.borrow_mut().undo();
//! assert_eq!(doc.to_json(), serde_json::json!([1]));
//! ```

pub mod history;
pub mod intercept;

pub use history::{HistoryTrack, TrackConfig};
pub use intercept::{
    ArrayHandler, ArrayProxy, DateHandler, DateProxy, Facade, Handler, HandlerRegistry,
    Interceptor, MapHandler, MapProxy, PassThroughHandler, Proxied, RecordHandler, RecordProxy,
    SetHandler, SetProxy, Subscription,
};
