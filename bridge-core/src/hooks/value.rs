//! Value-Bridge Hook
//!
//! Renders a component with the current value of an external source and
//! re-renders it once for every later change.
//!
//! The value is read with `peek()` at render time, so rendering never
//! records a dependency in whatever computation happens to be running. The
//! subscription is made in the commit phase of the same render. Earlier
//! effects of that commit may already have written the source, so once
//! subscribed the source is read again and compared with what was
//! rendered; a difference schedules one more render.

use std::fmt;

use crate::component::{use_layout_effect, RenderContext};
use crate::observable::{Observable, Readable, Subscribable};

use super::force_update::use_force_update;
use super::subscription::use_subscription;

/// Current value of `source`; any change re-renders the instance.
///
/// Works for read-only and writable sources alike. Passing a different
/// source on a later render moves the subscription to it.
pub fn use_observable<T, S>(cx: &mut RenderContext<'_>, source: &S) -> T
where
    T: Clone + PartialEq + Send + 'static,
    S: Readable<T> + Subscribable<T> + Clone + 'static,
{
    let force = use_force_update(cx);
    let notify = force.clone();
    use_subscription(cx, source, move |_: &T| notify.call());

    let value = source.peek();
    let rendered = value.clone();
    let current = source.clone();
    use_layout_effect(cx, source.source_id(), move || {
        if current.peek() != rendered {
            tracing::trace!(source = current.source_id().raw(), "source changed before subscribing");
            force.call();
        }
        None
    });
    value
}

/// Current value of a writable observable and a setter for it.
pub fn use_observable_state<T>(cx: &mut RenderContext<'_>, source: &Observable<T>) -> (T, Setter<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let value = use_observable(cx, source);
    (
        value,
        Setter {
            target: source.clone(),
        },
    )
}

/// Writes to the observable passed to [`use_observable_state`].
pub struct Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    target: Observable<T>,
}

impl<T> Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn set(&self, value: T) {
        self.target.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.target.update(f);
    }
}

impl<T> Clone for Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T>
where
    T: Clone + PartialEq + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("target", &self.target).finish()
    }
}
