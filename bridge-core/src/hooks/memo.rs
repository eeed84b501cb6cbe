//! Disposable-Memo Primitive
//!
//! A memoized value that must be released when it is replaced or when the
//! instance unmounts (a tracked computation holding subscriptions, for
//! example).

use std::sync::Arc;

use crate::component::{use_layout_effect, use_ref, Cleanup, RenderContext};

type Disposer<V> = Arc<dyn Fn(V) + Send + Sync>;

struct Memoized<V, D> {
    deps: D,
    value: V,
}

struct MemoCell<V, D> {
    current: Option<Memoized<V, D>>,
    /// Disposer passed to the latest render.
    disposer: Option<Disposer<V>>,
}

/// Return the value built by `factory`, rebuilding it only when `deps`
/// differs from the previous render's.
///
/// `disposer` receives each replaced value exactly once, and the live value
/// at unmount. The disposer from the latest render is the one used.
pub fn use_memo_with_disposer<V, D, F, X>(
    cx: &mut RenderContext<'_>,
    factory: F,
    disposer: X,
    deps: D,
) -> V
where
    V: Clone + Send + 'static,
    D: PartialEq + Send + 'static,
    F: FnOnce() -> V,
    X: Fn(V) + Send + Sync + 'static,
{
    let cell = use_ref(cx, || MemoCell::<V, D> {
        current: None,
        disposer: None,
    });

    let on_unmount = cell.clone();
    use_layout_effect(cx, (), move || {
        Some(Box::new(move || {
            let (current, disposer) = on_unmount.with(|cell| (cell.current.take(), cell.disposer.take()));
            if let (Some(memo), Some(dispose)) = (current, disposer) {
                dispose(memo.value);
            }
        }) as Cleanup)
    });

    let disposer: Disposer<V> = Arc::new(disposer);
    let reused = cell.with(|cell| {
        cell.disposer = Some(disposer.clone());
        cell.current
            .as_ref()
            .filter(|memo| memo.deps == deps)
            .map(|memo| memo.value.clone())
    });
    if let Some(value) = reused {
        return value;
    }

    if let Some(stale) = cell.with(|cell| cell.current.take()) {
        tracing::trace!(instance = cx.instance_id().raw(), "memo dependencies changed; disposing");
        disposer(stale.value);
    }

    let value = factory();
    cell.with(|cell| {
        cell.current = Some(Memoized {
            deps,
            value: value.clone(),
        })
    });
    value
}
