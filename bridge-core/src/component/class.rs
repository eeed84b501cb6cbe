//! Class-style components.
//!
//! Some components are objects with lifecycle methods instead of functions
//! calling hooks. They render from `&mut self`, are told when they are
//! about to be unmounted, and re-render on request through
//! [`ClassContext::force_update`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::dom::Node;

use super::host::Updater;
use super::instance::{RenderContext, Renderer};

/// A component with a render method and an unmount lifecycle method.
pub trait ClassComponent: Send + 'static {
    type Props: Send + Sync + 'static;

    /// Produce the component's output.
    fn render(&mut self, props: &Self::Props, cx: &ClassContext) -> Node;

    /// Called once, right before the instance is removed.
    fn component_will_unmount(&mut self) {}
}

/// What a class component can ask of its host while rendering.
#[derive(Debug, Clone)]
pub struct ClassContext {
    updater: Updater,
}

impl ClassContext {
    /// Mark the component dirty; it re-renders on the next flush.
    pub fn force_update(&self) {
        self.updater.schedule();
    }

    /// A handle to `force_update` that can outlive this render.
    pub fn updater(&self) -> Updater {
        self.updater.clone()
    }
}

pub(crate) struct ClassRenderer<C: ClassComponent> {
    component: C,
    props: Arc<RwLock<C::Props>>,
}

impl<C: ClassComponent> ClassRenderer<C> {
    pub(crate) fn new(component: C, props: Arc<RwLock<C::Props>>) -> Self {
        Self { component, props }
    }
}

impl<C: ClassComponent> Renderer for ClassRenderer<C> {
    fn render(&mut self, cx: &mut RenderContext<'_>) -> Node {
        let class_cx = ClassContext {
            updater: cx.updater(),
        };
        let props = self.props.read();
        self.component.render(&props, &class_cx)
    }

    fn will_unmount(&mut self) {
        self.component.component_will_unmount();
    }
}
