//! Template embedding.
//!
//! Lets a component contain observable-bound markup: the component owns an
//! element, and [`use_knockout_bindings`] applies bindings to it against a
//! view model that follows the component's renders.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::component::{use_layout_effect, use_memo, Cleanup, RenderContext};
use crate::dom::{Element, Node};
use crate::observable::Observable;

use super::binding::{apply_bindings, BindingEnv};
use super::value::VmValue;

/// Template markup by id. Templates are parsed each time they are
/// rendered, so re-registering an id affects later renders.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: Arc<RwLock<IndexMap<String, String>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>, source: impl Into<String>) {
        self.templates.write().insert(id.into(), source.into());
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.templates.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<String> {
        self.templates.write().shift_remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.templates.read().keys()).finish()
    }
}

/// Apply bindings to `element` against `vm`.
///
/// The view model lives in an observable owned by the instance and is
/// replaced in the commit phase whenever `vm` changes, which updates the
/// bindings that read it. Bindings are applied once per element and
/// disposed when the element changes or the instance unmounts. Binding
/// errors are logged.
pub fn use_knockout_bindings(cx: &mut RenderContext<'_>, env: &BindingEnv, element: &Element, vm: VmValue) {
    let view_model = use_memo(cx, (), || Observable::new(VmValue::Null));

    let target = view_model.clone();
    use_layout_effect(cx, vm.clone(), move || {
        target.set(vm);
        None
    });

    let env = env.clone();
    let bound = element.clone();
    use_layout_effect(cx, element.key(), move || {
        match apply_bindings(&env, &bound, VmValue::Observable(view_model)) {
            Ok(applied) => Some(Box::new(move || applied.dispose()) as Cleanup),
            Err(error) => {
                tracing::error!(%error, "failed to apply bindings to component element");
                None
            }
        }
    });
}

const TEMPLATE_BINDING: &str = "template: {\n    name: name,\n    data: data\n}";

/// Props of [`knockout_template`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateProps {
    pub name: String,
    pub data: Option<VmValue>,
}

impl TemplateProps {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: VmValue) -> Self {
        self.data = Some(data);
        self
    }
}

/// Renders the template `props.name` from `env` with `props.data` (an
/// empty object by default).
pub fn knockout_template(cx: &mut RenderContext<'_>, env: &BindingEnv, props: &TemplateProps) -> Node {
    let element = use_memo(cx, (), || Element::new("div").with_attr("data-bind", TEMPLATE_BINDING));

    let vm = VmValue::object([
        ("name", VmValue::from(props.name.clone())),
        ("data", props.data.clone().unwrap_or_else(VmValue::empty_object)),
    ]);
    use_knockout_bindings(cx, env, &element, vm);
    Node::Element(element)
}
