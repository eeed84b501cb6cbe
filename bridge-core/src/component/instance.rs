//! Component instances and the render context handed to hooks.
//!
//! An instance owns its hook slots: one boxed value per hook call, in call
//! order. The slots are the per-instance "binding" of everything the
//! component created while rendering; unmounting drops them all after
//! running the commit-phase cleanups.

use std::any::{type_name, Any};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dom::Node;

use super::host::{Host, Updater};

/// Teardown returned by a commit-phase effect.
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// Unique identifier for a mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Generate a new unique instance ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

/// What an instance runs to render: a function component or a class
/// component, with its props.
pub(crate) trait Renderer: Send {
    fn render(&mut self, cx: &mut RenderContext<'_>) -> Node;

    /// Unmount lifecycle notification.
    fn will_unmount(&mut self) {}
}

/// A commit-phase effect queued by a render.
pub(crate) struct PendingEffect {
    slot: usize,
    effect: Box<dyn FnOnce() -> Option<Cleanup> + Send>,
}

/// Everything left to release once an instance is removed from its host.
pub(crate) struct Teardown {
    cleanups: Vec<Cleanup>,
    slots: Vec<Box<dyn Any + Send>>,
}

impl Teardown {
    /// Run cleanups in hook order, then drop the slots.
    pub(crate) fn run(self) {
        for cleanup in self.cleanups {
            cleanup();
        }
        drop(self.slots);
    }
}

pub(crate) struct Instance {
    id: InstanceId,
    renderer: Box<dyn Renderer>,
    slots: Vec<Box<dyn Any + Send>>,
    /// Cleanup of the layout effect in each slot, if it returned one.
    cleanups: Vec<Option<Cleanup>>,
    view: Node,
    render_count: usize,
}

impl Instance {
    pub(crate) fn new(id: InstanceId, renderer: Box<dyn Renderer>) -> Self {
        Self {
            id,
            renderer,
            slots: Vec::new(),
            cleanups: Vec::new(),
            view: Node::empty(),
            render_count: 0,
        }
    }

    pub(crate) fn view(&self) -> Node {
        self.view.clone()
    }

    pub(crate) fn render_count(&self) -> usize {
        self.render_count
    }

    /// Run the render phase. Returns the effects to commit.
    pub(crate) fn render(&mut self, host: &Host) -> Vec<PendingEffect> {
        let Instance {
            id,
            renderer,
            slots,
            render_count,
            ..
        } = self;

        let mut cx = RenderContext {
            host,
            instance_id: *id,
            slots,
            cursor: 0,
            first_render: *render_count == 0,
            effects: Vec::new(),
        };
        let view = renderer.render(&mut cx);
        let effects = cx.finish();

        self.view = view;
        self.render_count += 1;
        effects
    }

    pub(crate) fn take_cleanup(&mut self, slot: usize) -> Option<Cleanup> {
        self.cleanups.get_mut(slot).and_then(Option::take)
    }

    pub(crate) fn store_cleanup(&mut self, slot: usize, cleanup: Option<Cleanup>) {
        if self.cleanups.len() <= slot {
            self.cleanups.resize_with(slot + 1, || None);
        }
        self.cleanups[slot] = cleanup;
    }

    /// Notify the renderer and hand back everything still owned.
    pub(crate) fn teardown(&mut self) -> Teardown {
        self.renderer.will_unmount();
        Teardown {
            cleanups: self.cleanups.drain(..).flatten().collect(),
            slots: std::mem::take(&mut self.slots),
        }
    }
}

impl PendingEffect {
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn run(self) -> Option<Cleanup> {
        (self.effect)()
    }
}

/// Per-render access to an instance's hook slots.
///
/// Hooks must be called in the same order on every render, exactly like
/// any hook-based component model requires.
pub struct RenderContext<'a> {
    host: &'a Host,
    instance_id: InstanceId,
    slots: &'a mut Vec<Box<dyn Any + Send>>,
    cursor: usize,
    first_render: bool,
    effects: Vec<PendingEffect>,
}

impl<'a> RenderContext<'a> {
    /// The host rendering this instance. Do not store it in hook slots;
    /// use [`Host::downgrade`] for that.
    pub fn host(&self) -> &Host {
        self.host
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Whether this is the instance's first render.
    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    /// Handle that schedules this instance for re-rendering.
    pub fn updater(&self) -> Updater {
        Updater::new(self.host, self.instance_id)
    }

    /// The next hook slot, created with `init` on the first render.
    ///
    /// # Panics
    ///
    /// Panics if hooks are called in a different order or number than on
    /// the first render.
    pub fn slot<H, F>(&mut self, init: F) -> (usize, &mut H)
    where
        H: Any + Send,
        F: FnOnce() -> H,
    {
        let index = self.cursor;
        self.cursor += 1;

        if index == self.slots.len() {
            assert!(
                self.first_render,
                "instance {} called more hooks than on its first render",
                self.instance_id.raw()
            );
            self.slots.push(Box::new(init()));
        }

        match self.slots[index].downcast_mut::<H>() {
            Some(slot) => (index, slot),
            None => panic!(
                "hook order changed in instance {}: slot {} is not a {}",
                self.instance_id.raw(),
                index,
                type_name::<H>()
            ),
        }
    }

    /// Queue a commit-phase effect for the slot at `slot`.
    pub(crate) fn queue_effect<E>(&mut self, slot: usize, effect: E)
    where
        E: FnOnce() -> Option<Cleanup> + Send + 'static,
    {
        self.effects.push(PendingEffect {
            slot,
            effect: Box::new(effect),
        });
    }

    fn finish(self) -> Vec<PendingEffect> {
        assert!(
            self.cursor == self.slots.len(),
            "instance {} called {} hooks but has {} slots",
            self.instance_id.raw(),
            self.cursor,
            self.slots.len()
        );
        self.effects
    }
}
