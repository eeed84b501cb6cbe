//! Bridge Hooks
//!
//! Hooks that let function components read observable-model state. They
//! are built from the host hooks in [`crate::component::hooks`]:
//!
//! - [`use_subscription`]: keep a callback subscribed to a source.
//! - [`use_force_update`]: a handle that requests one more render.
//! - [`use_observable`] / [`use_observable_state`]: render with a source's
//!   current value.
//! - [`use_computed`] / [`try_use_computed`]: render with a function of
//!   several sources, tracking exactly what it read.
//! - [`use_memo_with_disposer`]: a memoized value that is released when
//!   replaced or unmounted.
//!
//! # Example
//!
//! ```rust,ignore
//! use bridge_core::prelude::*;
//!
//! fn greeting(cx: &mut RenderContext<'_>, name: &Observable<String>) -> Node {
//!     let name: String = use_observable(cx, name);
//!     Node::text(format!("Hello, {name}"))
//! }
//!
//! let host = Host::new();
//! let name = Observable::new("World".to_string());
//! let root = host.mount(greeting, name.clone())?;
//!
//! host.act(|| name.set("Mark".to_string()))?;
//! assert_eq!(root.text(), "Hello, Mark");
//! ```

mod computed;
mod force_update;
mod memo;
mod subscription;
mod value;

pub use computed::{try_use_computed, use_computed};
pub use force_update::{use_force_update, ForceUpdate};
pub use memo::use_memo_with_disposer;
pub use subscription::use_subscription;
pub use value::{use_observable, use_observable_state, Setter};
