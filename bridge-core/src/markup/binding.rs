//! Binding Engine
//!
//! Applies the `data-bind` attributes of a markup tree to a view model.
//!
//! # How Bindings Are Applied
//!
//! 1. Walk the tree from the given element. Before an element's children
//!    are bound, each child is offered once to the preprocessor chain,
//!    which may replace it (the shorthand comment syntax works this way).
//!
//! 2. For every `name: expression` pair on an element, look up the handler
//!    registered under `name` and let it `init` a per-element
//!    [`ElementBinding`].
//!
//! 3. Run the binding's `update` inside a tracked computation: the
//!    expression is evaluated there, so every observable read while
//!    evaluating or updating becomes a dependency. A change to any of them
//!    runs `update` again, right away.
//!
//! 4. A binding that controls its descendants stops the walk; it binds
//!    them itself if it wants to.
//!
//! [`AppliedBindings`] owns everything created on the way. Disposing it
//! (or dropping it) releases every subscription and lets every binding
//! clean up.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::component::{Host, WeakHost};
use crate::config::BridgeConfig;
use crate::dom::{Element, Node};
use crate::error::{BridgeError, Result};
use crate::observable::TrackedComputation;

use super::expr::{parse_bindings, Expr};
use super::handlers::{ComponentHandler, TemplateHandler, TextHandler};
use super::preprocess::{NodePreprocessor, PreprocessorChain, ShorthandSyntax};
use super::template::TemplateRegistry;
use super::value::VmValue;

/// Creates the per-element state of one kind of binding.
pub trait BindingHandler: Send + Sync {
    fn init(&self, cx: &BindingContext<'_>) -> Result<Box<dyn ElementBinding>>;
}

/// One binding on one element.
pub trait ElementBinding: Send {
    /// Whether this binding takes over the element's descendants.
    fn controls_descendants(&self) -> bool {
        false
    }

    /// Apply the current value of the binding expression. Runs once when
    /// bindings are applied and again after each change to what it read.
    fn update(&mut self, cx: &BindingContext<'_>, value: &VmValue) -> Result<()>;

    /// Release whatever the binding created.
    fn dispose(&mut self) {}
}

/// What a binding sees of its surroundings.
pub struct BindingContext<'a> {
    element: &'a Element,
    env: &'a BindingEnv,
    data: &'a VmValue,
}

impl<'a> BindingContext<'a> {
    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn env(&self) -> &'a BindingEnv {
        self.env
    }

    /// The view model the expression is evaluated against.
    pub fn data(&self) -> &'a VmValue {
        self.data
    }
}

/// Handlers, templates and preprocessors used to apply bindings, and the
/// host that bound components are mounted into.
///
/// Cheap to clone; clones share their registries.
#[derive(Clone)]
pub struct BindingEnv {
    inner: Arc<EnvInner>,
}

struct EnvInner {
    host: WeakHost,
    config: BridgeConfig,
    handlers: RwLock<IndexMap<String, Arc<dyn BindingHandler>>>,
    templates: TemplateRegistry,
    preprocessors: RwLock<PreprocessorChain>,
}

impl BindingEnv {
    /// An environment with the built-in `text`, `template` and component
    /// handlers, using the host's configuration. The shorthand comment
    /// syntax is installed unless the configuration turns it off.
    pub fn new(host: &Host) -> Result<Self> {
        let config = host.config().clone();
        let env = Self {
            inner: Arc::new(EnvInner {
                host: host.downgrade(),
                config: config.clone(),
                handlers: RwLock::new(IndexMap::new()),
                templates: TemplateRegistry::new(),
                preprocessors: RwLock::new(PreprocessorChain::new()),
            }),
        };

        env.register_handler("text", TextHandler);
        env.register_handler("template", TemplateHandler);
        env.register_handler(
            config.binding_handler_name.clone(),
            ComponentHandler::new(config.binding_handler_name.clone()),
        );
        if config.shorthand_syntax {
            env.install_preprocessor(ShorthandSyntax::new(config.binding_handler_name.clone())?)?;
        }
        Ok(env)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// The host bound components are mounted into.
    pub fn host(&self) -> Result<Host> {
        self.inner.host.upgrade().ok_or(BridgeError::HostDropped)
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.inner.templates
    }

    /// Register (or replace) the handler for bindings named `name`.
    pub fn register_handler<H>(&self, name: impl Into<String>, handler: H)
    where
        H: BindingHandler + 'static,
    {
        let name = name.into();
        tracing::debug!(binding = %name, "registered binding handler");
        self.inner.handlers.write().insert(name, Arc::new(handler));
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn BindingHandler>> {
        self.inner.handlers.read().get(name).cloned()
    }

    /// Add a preprocessing step in front of the installed ones.
    pub fn install_preprocessor<P>(&self, step: P) -> Result<()>
    where
        P: NodePreprocessor + 'static,
    {
        self.inner.preprocessors.write().install(step)
    }

    fn preprocessors(&self) -> PreprocessorChain {
        self.inner.preprocessors.read().clone()
    }
}

impl fmt::Debug for BindingEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEnv")
            .field("handlers", &self.inner.handlers.read().keys().collect::<Vec<_>>())
            .field("preprocessors", &*self.inner.preprocessors.read())
            .finish()
    }
}

/// Apply the bindings of `element` and its descendants against
/// `view_model`.
///
/// Fails on the first malformed attribute, unknown binding or failing
/// handler; whatever was bound before the failure is disposed.
pub fn apply_bindings(env: &BindingEnv, element: &Element, view_model: VmValue) -> Result<AppliedBindings> {
    let mut applied = AppliedBindings::new();
    bind_element(env, element, &view_model, &mut applied.bindings)?;
    tracing::debug!(bindings = applied.len(), "applied bindings");
    Ok(applied)
}

/// Apply bindings to the descendants of `element` only, against `data`.
/// For handlers that control their descendants.
pub fn apply_bindings_to_descendants(
    env: &BindingEnv,
    element: &Element,
    data: &VmValue,
) -> Result<AppliedBindings> {
    let mut applied = AppliedBindings::new();
    bind_descendants(env, element, data, &mut applied.bindings)?;
    Ok(applied)
}

fn bind_element(
    env: &BindingEnv,
    element: &Element,
    data: &VmValue,
    out: &mut Vec<Arc<LiveBinding>>,
) -> Result<()> {
    let mut controls_descendants = false;

    if let Some(text) = element.attr("data-bind") {
        for (name, expr) in parse_bindings(&text)? {
            let handler = env
                .handler(&name)
                .ok_or_else(|| BridgeError::UnknownBinding(name.clone()))?;
            let cx = BindingContext { element, env, data };
            let state = handler.init(&cx)?;
            controls_descendants |= state.controls_descendants();

            let binding = LiveBinding::new(name, element.clone(), expr, data.clone(), env.clone(), state);
            out.push(binding.clone());
            binding.run()?;
        }
    }

    if controls_descendants {
        return Ok(());
    }
    bind_descendants(env, element, data, out)
}

fn bind_descendants(
    env: &BindingEnv,
    element: &Element,
    data: &VmValue,
    out: &mut Vec<Arc<LiveBinding>>,
) -> Result<()> {
    let chain = env.preprocessors();
    if !chain.is_empty() {
        let mut index = 0;
        for child in element.children() {
            match chain.preprocess(&child) {
                Some(replacement) => {
                    let count = replacement.len();
                    element.replace_child(index, replacement);
                    index += count;
                }
                None => index += 1,
            }
        }
    }

    for child in element.children() {
        if let Node::Element(child) = child {
            bind_element(env, &child, data, out)?;
        }
    }
    Ok(())
}

/// A binding of one element, kept up to date by its own tracked
/// computation.
struct LiveBinding {
    name: String,
    element: Element,
    expr: Expr,
    data: VmValue,
    env: BindingEnv,
    /// `None` while an update is running.
    state: Mutex<Option<Box<dyn ElementBinding>>>,
    computation: TrackedComputation<()>,
    disposed: AtomicBool,
}

impl LiveBinding {
    fn new(
        name: String,
        element: Element,
        expr: Expr,
        data: VmValue,
        env: BindingEnv,
        state: Box<dyn ElementBinding>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<LiveBinding>| {
            let weak = weak.clone();
            LiveBinding {
                name,
                element,
                expr,
                data,
                env,
                state: Mutex::new(Some(state)),
                computation: TrackedComputation::new(
                    || (),
                    move || {
                        if let Some(binding) = weak.upgrade() {
                            binding.refresh();
                        }
                    },
                ),
                disposed: AtomicBool::new(false),
            }
        })
    }

    fn refresh(&self) {
        if let Err(error) = self.run() {
            tracing::error!(binding = %self.name, %error, "binding update failed");
        }
    }

    fn run(&self) -> Result<()> {
        let Some(mut state) = self.state.lock().take() else {
            tracing::warn!(binding = %self.name, "binding changed during its own update; skipped");
            return Ok(());
        };

        let cx = BindingContext {
            element: &self.element,
            env: &self.env,
            data: &self.data,
        };
        let result = self.computation.evaluate_with(|| {
            let value = self.expr.evaluate(&self.data);
            state.update(&cx, &value)
        });

        if self.disposed.load(Ordering::SeqCst) {
            state.dispose();
        } else {
            *self.state.lock() = Some(state);
        }
        result
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.computation.dispose();
        let state = self.state.lock().take();
        if let Some(mut state) = state {
            state.dispose();
        }
    }
}

/// Everything created by one [`apply_bindings`] call.
#[must_use = "dropping AppliedBindings disposes them immediately"]
pub struct AppliedBindings {
    bindings: Vec<Arc<LiveBinding>>,
}

impl AppliedBindings {
    fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    /// Number of element bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of sources the bindings are subscribed to, in total.
    pub fn dependency_count(&self) -> usize {
        self.bindings
            .iter()
            .map(|binding| binding.computation.dependency_count())
            .sum()
    }

    /// Dispose every binding, innermost first.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        for binding in self.bindings.drain(..).rev() {
            binding.dispose();
        }
    }
}

impl Drop for AppliedBindings {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for AppliedBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|binding| &binding.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse::parse_element;
    use crate::observable::Observable;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        updates: Arc<AtomicUsize>,
        disposals: Arc<AtomicUsize>,
    }

    struct RecorderBinding {
        updates: Arc<AtomicUsize>,
        disposals: Arc<AtomicUsize>,
    }

    impl BindingHandler for Recorder {
        fn init(&self, _cx: &BindingContext<'_>) -> Result<Box<dyn ElementBinding>> {
            Ok(Box::new(RecorderBinding {
                updates: self.updates.clone(),
                disposals: self.disposals.clone(),
            }))
        }
    }

    impl ElementBinding for RecorderBinding {
        fn update(&mut self, _cx: &BindingContext<'_>, value: &VmValue) -> Result<()> {
            let _ = value.resolve();
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn dispose(&mut self) {
            self.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn env() -> (Host, BindingEnv) {
        let host = Host::new();
        let env = BindingEnv::new(&host).unwrap();
        (host, env)
    }

    #[test]
    fn text_binding_follows_observable() {
        let (_host, env) = env();
        let name = Observable::new(VmValue::from("World"));
        let element = parse_element(r#"<p>Hello, <span data-bind="text: name"></span></p>"#).unwrap();

        let applied = apply_bindings(
            &env,
            &element,
            VmValue::object([("name", VmValue::from(name.clone()))]),
        )
        .unwrap();
        assert_eq!(element.text_content(), "Hello, World");

        name.set(VmValue::from("Mark"));
        assert_eq!(element.text_content(), "Hello, Mark");

        applied.dispose();
        assert_eq!(name.subscription_count(), 0);
        name.set(VmValue::from("Gone"));
        assert_eq!(element.text_content(), "Hello, Mark");
    }

    #[test]
    fn updates_track_only_what_they_read() {
        let (_host, env) = env();
        let updates = Arc::new(AtomicUsize::new(0));
        let disposals = Arc::new(AtomicUsize::new(0));
        env.register_handler(
            "record",
            Recorder {
                updates: updates.clone(),
                disposals: disposals.clone(),
            },
        );

        let watched = Observable::new(VmValue::from(1.0));
        let other = Observable::new(VmValue::from(1.0));
        let element = parse_element(r#"<div data-bind="record: watched"></div>"#).unwrap();
        let applied = apply_bindings(
            &env,
            &element,
            VmValue::object([
                ("watched", VmValue::from(watched.clone())),
                ("other", VmValue::from(other.clone())),
            ]),
        )
        .unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(applied.dependency_count(), 1);

        other.set(VmValue::from(2.0));
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        watched.set(VmValue::from(2.0));
        assert_eq!(updates.load(Ordering::SeqCst), 2);

        drop(applied);
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
        assert_eq!(watched.subscription_count(), 0);
    }

    #[test]
    fn view_model_observable_is_a_dependency() {
        let (_host, env) = env();
        let vm = Observable::new(VmValue::object([("label", VmValue::from("one"))]));
        let element = parse_element(r#"<b data-bind="text: label"></b>"#).unwrap();

        let _applied = apply_bindings(&env, &element, VmValue::from(vm.clone())).unwrap();
        assert_eq!(element.text_content(), "one");

        vm.set(VmValue::object([("label", VmValue::from("two"))]));
        assert_eq!(element.text_content(), "two");
    }

    #[test]
    fn unknown_binding_fails_and_disposes_earlier_bindings() {
        let (_host, env) = env();
        let name = Observable::new(VmValue::from("x"));
        let element = parse_element(
            r#"<div><span data-bind="text: name"></span><span data-bind="shout: name"></span></div>"#,
        )
        .unwrap();

        let err = apply_bindings(&env, &element, VmValue::object([("name", VmValue::from(name.clone()))]))
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownBinding(binding) if binding == "shout"));
        assert_eq!(name.subscription_count(), 0);
    }

    #[test]
    fn malformed_binding_is_a_syntax_error() {
        let (_host, env) = env();
        let element = parse_element(r#"<div data-bind="text name"></div>"#).unwrap();

        assert!(matches!(
            apply_bindings(&env, &element, VmValue::Null),
            Err(BridgeError::BindingSyntax { .. })
        ));
    }
}
