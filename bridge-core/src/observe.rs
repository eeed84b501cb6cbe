//! Class-Component Adapter
//!
//! [`Observe`] wraps a class component so that everything its `render`
//! reads from the observable model is tracked, and a change to any of it
//! marks the component dirty.
//!
//! # How It Works
//!
//! 1. The first render creates a [`TrackedComputation`] whose change
//!    callback is the host's "mark dirty" primitive for this instance.
//!
//! 2. Every render runs the delegate's `render` inside that computation, so
//!    the dependency set always matches the latest render.
//!
//! 3. Before the delegate hears about its unmount, the computation is
//!    disposed and every subscription released.

use std::marker::PhantomData;

use crate::component::{ClassComponent, ClassContext};
use crate::dom::Node;
use crate::observable::TrackedComputation;

/// A class component whose renders track observable reads.
pub struct Observe<C: ClassComponent> {
    delegate: C,
    computation: Option<TrackedComputation<()>>,
}

impl<C: ClassComponent> Observe<C> {
    pub fn new(delegate: C) -> Self {
        Self {
            delegate,
            computation: None,
        }
    }

    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    /// Number of sources read by the latest render.
    pub fn dependency_count(&self) -> usize {
        self.computation
            .as_ref()
            .map_or(0, TrackedComputation::dependency_count)
    }
}

impl<C: ClassComponent> ClassComponent for Observe<C> {
    type Props = C::Props;

    fn render(&mut self, props: &Self::Props, cx: &ClassContext) -> Node {
        let computation = self.computation.get_or_insert_with(|| {
            let updater = cx.updater();
            TrackedComputation::new(
                || (),
                move || {
                    tracing::trace!(instance = updater.instance_id().raw(), "observed read changed");
                    updater.schedule();
                },
            )
        });
        let delegate = &mut self.delegate;
        computation.evaluate_with(|| delegate.render(props, cx))
    }

    fn component_will_unmount(&mut self) {
        if let Some(computation) = self.computation.take() {
            computation.dispose();
        }
        self.delegate.component_will_unmount();
    }
}

/// Wrap a class component so it re-renders when what it reads changes.
pub fn observe<C: ClassComponent>(component: C) -> Observe<C> {
    Observe::new(component)
}

/// A plain render function as a class component.
pub struct Stateless<P, F> {
    render: F,
    _props: PhantomData<fn(&P)>,
}

impl<P, F> ClassComponent for Stateless<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&P) -> Node + Send + 'static,
{
    type Props = P;

    fn render(&mut self, props: &P, _cx: &ClassContext) -> Node {
        (self.render)(props)
    }
}

/// Turn a render function into an observing class component.
pub fn observe_fn<P, F>(render: F) -> Observe<Stateless<P, F>>
where
    P: Send + Sync + 'static,
    F: Fn(&P) -> Node + Send + 'static,
{
    observe(Stateless {
        render,
        _props: PhantomData,
    })
}
