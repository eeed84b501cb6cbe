//! Subscription Primitive
//!
//! Subscribes a component instance to an external source for as long as the
//! instance keeps passing that source.
//!
//! # How It Works
//!
//! 1. Every render stores the callback it was given in a single-slot holder.
//!    The subscription itself never changes because of a new callback; it
//!    forwards each notification to whatever callback the holder has now.
//!
//! 2. The subscription is made in the commit phase of the render that first
//!    sees a source identity. A render with a different source disposes the
//!    old subscription before the new one is made.
//!
//! 3. Unmount disposes the active subscription.
//!
//! Subscribing never renders anything; the callback decides what to do.

use std::sync::Arc;

use crate::component::{use_layout_effect, use_ref, Cleanup, RenderContext};
use crate::observable::Subscribable;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Keep `callback` subscribed to `source` while this instance is mounted.
pub fn use_subscription<T, S, F>(cx: &mut RenderContext<'_>, source: &S, callback: F)
where
    T: 'static,
    S: Subscribable<T> + Clone + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    let latest = use_ref(cx, || None::<Callback<T>>);
    latest.set(Some(Arc::new(callback)));

    let source_id = source.source_id();
    let source = source.clone();
    use_layout_effect(cx, source_id, move || {
        tracing::trace!(source = source_id.raw(), "subscribing component");
        let subscription = source.subscribe(move |value: &T| {
            if let Some(callback) = latest.get() {
                callback(value);
            }
        });
        Some(Box::new(move || subscription.dispose()) as Cleanup)
    });
}
