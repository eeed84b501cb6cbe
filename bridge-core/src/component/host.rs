//! Component Host
//!
//! The host mounts root components, keeps their hook slots, and re-renders
//! them when they ask to be updated.
//!
//! # How Rendering Works
//!
//! 1. `mount` creates an instance and renders it immediately.
//!
//! 2. Every render is followed, synchronously, by its commit phase: the
//!    cleanups of layout effects whose dependencies changed run, then the
//!    effects themselves. Nothing can happen between a render and its
//!    commit, so a subscription made in the commit phase cannot miss a
//!    change made after the render.
//!
//! 3. Update requests (state setters, forced updates, class
//!    `force_update`) only put the instance in the [`UpdateQueue`].
//!    [`Host::flush`] is "the next render pass": it renders every queued
//!    instance once.
//!
//! 4. `unmount` runs the unmount lifecycle and every remaining cleanup,
//!    then drops the instance's slots.
//!
//! # Locking
//!
//! The host map, the queue and each instance have their own lock. User code
//! (renders, effects, cleanups) never runs while the map or queue lock is
//! held, and effects and cleanups never run while the instance lock is
//! held, so they are free to mount, unmount or schedule other instances.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::config::BridgeConfig;
use crate::dom::{Node, ViewSource};
use crate::error::{BridgeError, Result};

use super::class::{ClassComponent, ClassRenderer};
use super::instance::{Instance, InstanceId, Renderer, RenderContext};
use super::scheduler::UpdateQueue;

/// Handle to a component host. Clones share the host.
///
/// Dropping the last handle unmounts every instance still mounted.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

/// Non-owning handle to a host.
#[derive(Clone)]
pub struct WeakHost {
    inner: Weak<HostInner>,
}

pub(crate) struct HostInner {
    config: BridgeConfig,
    instances: Mutex<IndexMap<InstanceId, Arc<Mutex<Instance>>>>,
    queue: Mutex<UpdateQueue>,
    flushing: AtomicBool,
}

impl Host {
    /// Create a host with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            inner: Arc::new(HostInner {
                config,
                instances: Mutex::new(IndexMap::new()),
                queue: Mutex::new(UpdateQueue::new()),
                flushing: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakHost {
        WeakHost {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Mount a function component with `props` and render it.
    pub fn mount<P, F>(&self, component: F, props: P) -> Result<Root<P>>
    where
        P: Send + Sync + 'static,
        F: Fn(&mut RenderContext<'_>, &P) -> Node + Send + 'static,
    {
        let props = Arc::new(RwLock::new(props));
        let renderer = FnRenderer {
            component,
            props: props.clone(),
        };
        let id = self.mount_renderer(Box::new(renderer))?;
        Ok(Root {
            host: self.clone(),
            id,
            props,
        })
    }

    /// Mount a class component with `props` and render it.
    pub fn mount_class<C>(&self, component: C, props: C::Props) -> Result<Root<C::Props>>
    where
        C: ClassComponent,
    {
        let props = Arc::new(RwLock::new(props));
        let renderer = ClassRenderer::new(component, props.clone());
        let id = self.mount_renderer(Box::new(renderer))?;
        Ok(Root {
            host: self.clone(),
            id,
            props,
        })
    }

    fn mount_renderer(&self, renderer: Box<dyn Renderer>) -> Result<InstanceId> {
        let id = InstanceId::new();
        let instance = Arc::new(Mutex::new(Instance::new(id, renderer)));
        self.inner.instances.lock().insert(id, instance);
        tracing::debug!(instance = id.raw(), "mounting component");

        self.render_instance(id)?;
        self.flush()?;
        Ok(id)
    }

    /// Render every queued instance once, repeating while renders and
    /// their effects queue more updates. Returns the number of renders.
    ///
    /// A `flush` called while another is running returns `Ok(0)`; the
    /// running flush picks up whatever was queued.
    pub fn flush(&self) -> Result<usize> {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let _guard = FlushGuard(&self.inner.flushing);

        let max_passes = self.inner.config.max_update_depth;
        let mut renders = 0;
        let mut passes = 0;

        loop {
            let batch = self.inner.queue.lock().drain();
            if batch.is_empty() {
                break;
            }
            passes += 1;
            if passes > max_passes {
                self.inner.queue.lock().clear();
                tracing::error!(passes = max_passes, "update loop detected; dropping pending updates");
                return Err(BridgeError::UpdateDepthExceeded { passes: max_passes });
            }
            for id in batch {
                if self.render_instance(id)? {
                    renders += 1;
                }
            }
        }

        if renders > 0 {
            tracing::debug!(renders, passes, "flushed pending updates");
        }
        Ok(renders)
    }

    /// Run `f`, then flush. The usual way to perform a batch of writes in
    /// tests and event handlers.
    pub fn act<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let result = f();
        self.flush()?;
        Ok(result)
    }

    /// Number of instances waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Number of mounted instances.
    pub fn mounted_count(&self) -> usize {
        self.inner.instances.lock().len()
    }

    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.inner.instances.lock().contains_key(&id)
    }

    /// Latest output of a mounted instance.
    pub fn view(&self, id: InstanceId) -> Option<Node> {
        self.inner.view(id)
    }

    /// Render and commit one instance. Returns `false` if it is no longer
    /// mounted.
    fn render_instance(&self, id: InstanceId) -> Result<bool> {
        let Some(instance) = self.inner.instance(id) else {
            return Ok(false);
        };

        let effects = instance.lock().render(self);
        tracing::trace!(instance = id.raw(), effects = effects.len(), "rendered");

        // Commit: tear down every changed effect before running any of them.
        for effect in &effects {
            let cleanup = instance.lock().take_cleanup(effect.slot());
            if let Some(cleanup) = cleanup {
                cleanup();
            }
        }
        for effect in effects {
            let slot = effect.slot();
            let cleanup = effect.run();
            if self.is_mounted(id) {
                instance.lock().store_cleanup(slot, cleanup);
            } else if let Some(cleanup) = cleanup {
                // Unmounted by its own effect: nothing else will run this.
                cleanup();
            }
        }
        Ok(true)
    }

    /// Unmount an instance: unmount lifecycle, cleanups, then slots.
    pub fn unmount(&self, id: InstanceId) -> Result<()> {
        let instance = self
            .inner
            .instances
            .lock()
            .shift_remove(&id)
            .ok_or(BridgeError::UnmountedInstance(id.raw()))?;
        self.inner.queue.lock().remove(id);

        tracing::debug!(instance = id.raw(), "unmounting component");
        HostInner::teardown(&instance);
        Ok(())
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("mounted", &self.mounted_count())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl WeakHost {
    pub fn upgrade(&self) -> Option<Host> {
        self.inner.upgrade().map(|inner| Host { inner })
    }
}

impl fmt::Debug for WeakHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHost")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl HostInner {
    fn instance(&self, id: InstanceId) -> Option<Arc<Mutex<Instance>>> {
        self.instances.lock().get(&id).cloned()
    }

    fn view(&self, id: InstanceId) -> Option<Node> {
        self.instance(id).map(|instance| instance.lock().view())
    }

    fn schedule(&self, id: InstanceId) -> bool {
        if !self.instances.lock().contains_key(&id) {
            tracing::debug!(instance = id.raw(), "ignoring update for unmounted component");
            return false;
        }
        self.queue.lock().schedule(id);
        true
    }

    fn teardown(instance: &Arc<Mutex<Instance>>) {
        let teardown = instance.lock().teardown();
        teardown.run();
    }
}

impl Drop for HostInner {
    fn drop(&mut self) {
        let instances: Vec<_> = self.instances.get_mut().drain(..).collect();
        if !instances.is_empty() {
            tracing::debug!(count = instances.len(), "host dropped; unmounting remaining components");
        }
        for (_, instance) in instances {
            HostInner::teardown(&instance);
        }
    }
}

struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The "mark this component dirty" primitive.
///
/// Cheap to clone and safe to call any number of times, from anywhere;
/// calls after the instance is unmounted (or the host dropped) are
/// ignored.
#[derive(Clone)]
pub struct Updater {
    host: Weak<HostInner>,
    id: InstanceId,
}

impl Updater {
    pub(crate) fn new(host: &Host, id: InstanceId) -> Self {
        Self {
            host: Arc::downgrade(&host.inner),
            id,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    /// Queue the instance for the next flush. Returns `false` if it is no
    /// longer mounted.
    pub fn schedule(&self) -> bool {
        match self.host.upgrade() {
            Some(host) => host.schedule(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater").field("instance", &self.id.raw()).finish()
    }
}

/// A mounted root component and its props.
pub struct Root<P> {
    host: Host,
    id: InstanceId,
    props: Arc<RwLock<P>>,
}

impl<P> Root<P>
where
    P: Send + Sync + 'static,
{
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn is_mounted(&self) -> bool {
        self.host.is_mounted(self.id)
    }

    /// Latest output; empty once unmounted.
    pub fn view(&self) -> Node {
        self.host.view(self.id).unwrap_or_else(Node::empty)
    }

    /// Text content of the latest output.
    pub fn text(&self) -> String {
        self.view().text_content()
    }

    /// Number of times the component has rendered.
    pub fn render_count(&self) -> usize {
        self.host
            .inner
            .instance(self.id)
            .map(|instance| instance.lock().render_count())
            .unwrap_or(0)
    }

    /// Replace the props and queue a re-render.
    pub fn set_props(&self, props: P) {
        *self.props.write() = props;
        self.host.inner.schedule(self.id);
    }

    /// Modify the props in place and queue a re-render.
    pub fn update_props(&self, f: impl FnOnce(&mut P)) {
        f(&mut self.props.write());
        self.host.inner.schedule(self.id);
    }

    /// Content source for an element this root is displayed in.
    pub fn view_source(&self) -> Arc<dyn ViewSource> {
        Arc::new(RootView {
            host: Arc::downgrade(&self.host.inner),
            id: self.id,
        })
    }

    pub fn unmount(&self) -> Result<()> {
        self.host.unmount(self.id)
    }

    /// A handle that does not keep the host alive.
    pub fn downgrade(&self) -> WeakRoot<P> {
        WeakRoot {
            host: self.host.downgrade(),
            id: self.id,
            props: self.props.clone(),
        }
    }
}

/// Non-owning handle to a [`Root`].
pub struct WeakRoot<P> {
    host: WeakHost,
    id: InstanceId,
    props: Arc<RwLock<P>>,
}

impl<P> WeakRoot<P> {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The root, if its host is still alive.
    pub fn upgrade(&self) -> Option<Root<P>> {
        self.host.upgrade().map(|host| Root {
            host,
            id: self.id,
            props: self.props.clone(),
        })
    }
}

impl<P> Clone for WeakRoot<P> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            id: self.id,
            props: self.props.clone(),
        }
    }
}

impl<P> fmt::Debug for WeakRoot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRoot").field("instance", &self.id.raw()).finish()
    }
}

impl<P> fmt::Debug for Root<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("instance", &self.id.raw()).finish()
    }
}

struct RootView {
    host: Weak<HostInner>,
    id: InstanceId,
}

impl ViewSource for RootView {
    fn current_view(&self) -> Option<Node> {
        self.host.upgrade().and_then(|host| host.view(self.id))
    }
}

struct FnRenderer<P, F> {
    component: F,
    props: Arc<RwLock<P>>,
}

impl<P, F> Renderer for FnRenderer<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&mut RenderContext<'_>, &P) -> Node + Send + 'static,
{
    fn render(&mut self, cx: &mut RenderContext<'_>) -> Node {
        let props = self.props.read();
        (self.component)(cx, &props)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::hooks::use_layout_effect;
    use crate::component::Cleanup;
    use std::sync::atomic::AtomicUsize;

    fn label(_cx: &mut RenderContext<'_>, text: &String) -> Node {
        Node::text(text.clone())
    }

    #[test]
    fn mount_renders_immediately() {
        let host = Host::new();
        let root = host.mount(label, "ready".to_string()).unwrap();

        assert_eq!(root.text(), "ready");
        assert_eq!(root.render_count(), 1);
        assert_eq!(host.mounted_count(), 1);
        assert_eq!(host.pending_count(), 0);
    }

    #[test]
    fn prop_changes_wait_for_flush() {
        let host = Host::new();
        let root = host.mount(label, "a".to_string()).unwrap();

        root.set_props("b".to_string());
        root.update_props(|text| text.push('c'));
        assert_eq!(host.pending_count(), 1);
        assert_eq!(root.text(), "a");

        assert_eq!(host.flush().unwrap(), 1);
        assert_eq!(root.text(), "bc");
        assert_eq!(host.flush().unwrap(), 0);
    }

    #[test]
    fn act_flushes_after_the_closure() {
        let host = Host::new();
        let root = host.mount(label, "a".to_string()).unwrap();

        let value = host.act(|| {
            root.set_props("b".to_string());
            7
        });
        assert_eq!(value.unwrap(), 7);
        assert_eq!(root.text(), "b");
    }

    #[test]
    fn unmount_twice_is_an_error() {
        let host = Host::new();
        let root = host.mount(label, "a".to_string()).unwrap();
        let id = root.id();

        root.unmount().unwrap();
        assert!(!root.is_mounted());
        assert_eq!(root.text(), "");
        assert!(matches!(
            root.unmount(),
            Err(BridgeError::UnmountedInstance(raw)) if raw == id.raw()
        ));
    }

    #[test]
    fn updates_after_unmount_are_ignored() {
        let host = Host::new();
        let updater: Arc<Mutex<Option<Updater>>> = Arc::new(Mutex::new(None));
        let slot = updater.clone();
        let root = host
            .mount(
                move |cx, _: &()| {
                    *slot.lock() = Some(cx.updater());
                    Node::empty()
                },
                (),
            )
            .unwrap();

        let updater = updater.lock().clone().unwrap();
        assert!(updater.schedule());
        root.unmount().unwrap();
        assert!(!updater.schedule());
        assert_eq!(host.pending_count(), 0);
    }

    #[test]
    fn dropping_host_runs_cleanups() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let counter = cleanups.clone();
        {
            let host = Host::new();
            let _root = host
                .mount(
                    move |cx, _: &()| {
                        let counter = counter.clone();
                        use_layout_effect(cx, (), move || {
                            let cleanup: Cleanup = Box::new(move || {
                                counter.fetch_add(1, Ordering::SeqCst);
                            });
                            Some(cleanup)
                        });
                        Node::empty()
                    },
                    (),
                )
                .unwrap();
            assert_eq!(cleanups.load(Ordering::SeqCst), 0);
        }
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_flush_returns_zero() {
        let host = Host::new();
        let nested: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let log = nested.clone();
        let handle = host.downgrade();

        let root = host
            .mount(
                move |cx, step: &u32| {
                    let log = log.clone();
                    let handle = handle.clone();
                    use_layout_effect(cx, *step, move || {
                        if let Some(host) = handle.upgrade() {
                            if let Ok(renders) = host.flush() {
                                log.lock().push(renders);
                            }
                        }
                        None
                    });
                    Node::text(step.to_string())
                },
                0,
            )
            .unwrap();

        root.set_props(1);
        assert_eq!(host.flush().unwrap(), 1);
        // The mount-time effect ran outside any flush; the second inside one.
        assert_eq!(*nested.lock(), vec![0, 0]);
        assert_eq!(root.text(), "1");
    }

    #[test]
    fn view_source_follows_the_root() {
        let host = Host::new();
        let root = host.mount(label, "first".to_string()).unwrap();
        let source = root.view_source();

        root.set_props("second".to_string());
        host.flush().unwrap();
        assert_eq!(source.current_view().map(|v| v.text_content()).as_deref(), Some("second"));

        root.unmount().unwrap();
        assert!(source.current_view().is_none());
    }

    #[test]
    fn weak_root_does_not_keep_the_host() {
        let host = Host::new();
        let root = host.mount(label, "a".to_string()).unwrap();
        let weak = root.downgrade();

        let upgraded = weak.upgrade().unwrap();
        assert_eq!(upgraded.id(), root.id());
        assert_eq!(upgraded.text(), "a");
        drop(upgraded);

        drop(root);
        drop(host);
        assert!(weak.upgrade().is_none());
    }
}
