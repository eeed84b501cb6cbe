//! Host hooks.
//!
//! The primitive per-instance hooks of the component model. The bridge
//! hooks in [`crate::hooks`] are built from these.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::host::Updater;
use super::instance::{Cleanup, RenderContext};

/// Setter for a piece of instance state.
///
/// Setting always queues a re-render of the owning instance; many sets
/// before the next flush produce one render.
pub struct StateSetter<T> {
    cell: Arc<Mutex<T>>,
    updater: Updater,
}

impl<T> StateSetter<T>
where
    T: Send + 'static,
{
    pub fn set(&self, value: T) {
        *self.cell.lock() = value;
        self.updater.schedule();
    }

    /// Compute the next state from the current one. Repeated calls before
    /// a render each see the result of the previous call.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        {
            let mut cell = self.cell.lock();
            let next = f(&cell);
            *cell = next;
        }
        self.updater.schedule();
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            updater: self.updater.clone(),
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter").field("updater", &self.updater).finish()
    }
}

/// Instance state and its setter.
pub fn use_state<T, F>(cx: &mut RenderContext<'_>, init: F) -> (T, StateSetter<T>)
where
    T: Clone + Send + 'static,
    F: FnOnce() -> T,
{
    let updater = cx.updater();
    let (_, cell) = cx.slot(|| Arc::new(Mutex::new(init())));
    let cell = cell.clone();
    let value = cell.lock().clone();
    (value, StateSetter { cell, updater })
}

/// Mutable single-slot holder that survives re-renders without causing
/// any.
pub struct Ref<T> {
    cell: Arc<Mutex<T>>,
}

impl<T> Ref<T> {
    pub fn set(&self, value: T) {
        *self.cell.lock() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.lock())
    }
}

impl<T: Clone> Ref<T> {
    pub fn get(&self) -> T {
        self.cell.lock().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

/// A [`Ref`] created with `init` on the first render.
pub fn use_ref<T, F>(cx: &mut RenderContext<'_>, init: F) -> Ref<T>
where
    T: Send + 'static,
    F: FnOnce() -> T,
{
    let (_, cell) = cx.slot(|| Arc::new(Mutex::new(init())));
    Ref { cell: cell.clone() }
}

struct MemoSlot<T, D> {
    deps: D,
    value: T,
}

/// Recompute `f()` only when `deps` differs from the previous render's.
pub fn use_memo<T, D, F>(cx: &mut RenderContext<'_>, deps: D, f: F) -> T
where
    T: Clone + Send + 'static,
    D: PartialEq + Send + 'static,
    F: FnOnce() -> T,
{
    let (_, slot) = cx.slot(|| None::<MemoSlot<T, D>>);
    match slot {
        Some(memo) if memo.deps == deps => memo.value.clone(),
        _ => {
            let value = f();
            *slot = Some(MemoSlot {
                deps,
                value: value.clone(),
            });
            value
        }
    }
}

struct EffectSlot<D> {
    deps: Option<D>,
}

/// Run `effect` in the commit phase of this render if `deps` changed since
/// the previous render (always on the first render). The cleanup it
/// returns runs before the next run of the effect and at unmount.
///
/// The commit phase runs synchronously after the render, before the host
/// returns control, so there is no window between the render and the
/// effect.
pub fn use_layout_effect<D, E>(cx: &mut RenderContext<'_>, deps: D, effect: E)
where
    D: PartialEq + Send + 'static,
    E: FnOnce() -> Option<Cleanup> + Send + 'static,
{
    let (index, slot) = cx.slot(|| EffectSlot::<D> { deps: None });
    if slot.deps.as_ref() == Some(&deps) {
        return;
    }
    slot.deps = Some(deps);
    cx.queue_effect(index, effect);
}
