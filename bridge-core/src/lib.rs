//! Bridge Core
//!
//! This crate connects two UI reactivity models:
//!
//! - an observable model, where computations record the cells they read
//!   and are notified when those cells change, and
//! - a component model, where function components call hooks and are
//!   re-rendered by a host when they ask to be.
//!
//! It implements:
//!
//! - Hooks that render components from observable state
//!   (`use_observable`, `use_computed`, ...)
//! - A class-component adapter that tracks everything a render reads
//! - Observable-bound markup that can mount components, and components that
//!   can contain bound markup
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observable`: observable and computed cells, tracked computations
//! - `component`: the component host, hook slots and class components
//! - `hooks`: the bridge hooks
//! - `observe`: the class-component adapter
//! - `markup`: binding expressions, the binding engine and its handlers
//! - `dom`: the document nodes both sides render into
//!
//! # Example
//!
//! ```rust,ignore
//! use bridge_core::prelude::*;
//!
//! #[derive(Clone)]
//! struct Person {
//!     first: Observable<String>,
//!     last: Observable<String>,
//! }
//!
//! fn full_name(cx: &mut RenderContext<'_>, person: &Person) -> Node {
//!     let person = person.clone();
//!     let name = use_computed(cx, move || {
//!         format!("{} {}", person.first.get(), person.last.get())
//!     }, ());
//!     Node::text(name)
//! }
//!
//! let host = Host::new();
//! let person = Person {
//!     first: Observable::new("Bob".to_string()),
//!     last: Observable::new("Ross".to_string()),
//! };
//! let root = host.mount(full_name, person.clone())?;
//!
//! // Both changes are rendered by a single pass.
//! host.act(|| {
//!     person.first.set("Uno".to_string());
//!     person.first.set("Deux".to_string());
//! })?;
//! assert_eq!(root.text(), "Deux Ross");
//! ```

pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod hooks;
pub mod markup;
pub mod observable;
pub mod observe;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};

/// The types and hooks most components need.
pub mod prelude {
    pub use crate::component::{
        use_layout_effect, use_memo, use_ref, use_state, ClassComponent, ClassContext, Host,
        RenderContext, Root,
    };
    pub use crate::dom::{Element, Node};
    pub use crate::hooks::{
        try_use_computed, use_computed, use_force_update, use_memo_with_disposer,
        use_observable, use_observable_state, use_subscription,
    };
    pub use crate::markup::{apply_bindings, BindingEnv, ComponentRef, VmValue};
    pub use crate::observable::{Computed, Observable, Readable, Subscribable, Writable};
    pub use crate::observe::{observe, observe_fn, Observe};
    pub use crate::{BridgeConfig, BridgeError, Result};
}
