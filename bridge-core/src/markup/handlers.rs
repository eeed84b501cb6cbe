//! Built-in binding handlers.

use crate::component::WeakRoot;
use crate::dom::Element;
use crate::error::{BridgeError, Result};
use crate::observable::ignore_dependencies;

use super::binding::{apply_bindings_to_descendants, AppliedBindings, BindingContext, BindingHandler, ElementBinding};
use super::parse::parse_fragment;
use super::value::{ComponentRef, VmValue};

/// `text: value` replaces the element's content with the value as text.
pub struct TextHandler;

struct TextBinding;

impl BindingHandler for TextHandler {
    fn init(&self, _cx: &BindingContext<'_>) -> Result<Box<dyn ElementBinding>> {
        Ok(Box::new(TextBinding))
    }
}

impl ElementBinding for TextBinding {
    fn controls_descendants(&self) -> bool {
        true
    }

    fn update(&mut self, cx: &BindingContext<'_>, value: &VmValue) -> Result<()> {
        cx.element().set_text(value.resolve().display_text());
        Ok(())
    }
}

/// `template: { name: id, data: value }` (or `template: id`) renders a
/// registered template into the element, binding it against `data`, or
/// against the current view model when there is no data.
pub struct TemplateHandler;

#[derive(Default)]
struct TemplateBinding {
    rendered: Option<AppliedBindings>,
}

impl BindingHandler for TemplateHandler {
    fn init(&self, _cx: &BindingContext<'_>) -> Result<Box<dyn ElementBinding>> {
        Ok(Box::new(TemplateBinding::default()))
    }
}

impl ElementBinding for TemplateBinding {
    fn controls_descendants(&self) -> bool {
        true
    }

    fn update(&mut self, cx: &BindingContext<'_>, value: &VmValue) -> Result<()> {
        let value = value.resolve();
        let (name, data) = match &value {
            VmValue::String(name) => (name.clone(), None),
            VmValue::Object(_) => (
                value
                    .get("name")
                    .map(VmValue::resolve)
                    .and_then(|name| name.as_str().map(str::to_string))
                    .unwrap_or_default(),
                value.get("data").map(VmValue::resolve).filter(|data| !data.is_null()),
            ),
            other => return Err(BridgeError::UnknownTemplate(other.display_text())),
        };

        let source = cx
            .env()
            .templates()
            .get(&name)
            .ok_or_else(|| BridgeError::UnknownTemplate(name.clone()))?;
        let nodes = parse_fragment(&source)?;

        if let Some(previous) = self.rendered.take() {
            previous.dispose();
        }
        let element = cx.element();
        element.set_children(nodes);

        let data = data.unwrap_or_else(|| cx.data().clone());
        let env = cx.env();
        self.rendered = Some(ignore_dependencies(|| {
            apply_bindings_to_descendants(env, element, &data)
        })?);
        tracing::trace!(template = %name, "rendered template");
        Ok(())
    }

    fn dispose(&mut self) {
        if let Some(rendered) = self.rendered.take() {
            rendered.dispose();
        }
    }
}

/// Mounts a component into the element:
/// `{ Component: ref, props: value }`.
///
/// `params` is accepted in place of `props`. If `props` is an observable
/// the component re-renders with its new value; observables *inside* the
/// props do not re-render it.
pub struct ComponentHandler {
    name: String,
}

impl ComponentHandler {
    /// A handler reporting errors under the binding name `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

struct ComponentBinding {
    handler: String,
    element: Element,
    mounted: Option<(ComponentRef, WeakRoot<VmValue>)>,
}

impl BindingHandler for ComponentHandler {
    fn init(&self, cx: &BindingContext<'_>) -> Result<Box<dyn ElementBinding>> {
        Ok(Box::new(ComponentBinding {
            handler: self.name.clone(),
            element: cx.element().clone(),
            mounted: None,
        }))
    }
}

impl ComponentBinding {
    fn unmount(&mut self) {
        if let Some((component, root)) = self.mounted.take() {
            self.element.unmount_view();
            if let Some(root) = root.upgrade() {
                if let Err(error) = root.unmount() {
                    tracing::debug!(component = component.name(), %error, "bound component already unmounted");
                }
            }
        }
    }
}

impl ElementBinding for ComponentBinding {
    fn controls_descendants(&self) -> bool {
        true
    }

    fn update(&mut self, cx: &BindingContext<'_>, value: &VmValue) -> Result<()> {
        let value = value.resolve();
        let component = value
            .get("Component")
            .map(VmValue::resolve)
            .and_then(|component| component.as_component().cloned())
            .ok_or_else(|| BridgeError::MissingComponent {
                handler: self.handler.clone(),
            })?;

        // Reading `props` here subscribes the binding to a props
        // observable, but not to observables inside the props.
        let props = ["props", "params"]
            .iter()
            .filter_map(|key| value.get(key).map(VmValue::resolve))
            .find(|props| !props.is_null())
            .unwrap_or_else(VmValue::empty_object);

        let host = cx.env().host()?;
        ignore_dependencies(|| {
            let current = self
                .mounted
                .as_ref()
                .filter(|(mounted, _)| *mounted == component)
                .and_then(|(_, root)| root.upgrade())
                .filter(|root| root.is_mounted());

            match current {
                Some(root) => {
                    root.set_props(props);
                    host.flush()?;
                }
                None => {
                    self.unmount();
                    let render = component.clone();
                    let root = host.mount(move |cx, props: &VmValue| render.render(cx, props), props)?;
                    tracing::debug!(component = component.name(), "mounted bound component");
                    cx.element().mount_view(root.view_source());
                    self.mounted = Some((component, root.downgrade()));
                }
            }
            Ok(())
        })
    }

    fn dispose(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Host, RenderContext};
    use crate::config::BridgeConfig;
    use crate::dom::Node;
    use crate::markup::binding::{apply_bindings, BindingEnv};
    use crate::markup::parse::parse_element;
    use crate::observable::Observable;

    fn greeter_view(_cx: &mut RenderContext<'_>, props: &VmValue) -> Node {
        let name = props
            .get("name")
            .and_then(VmValue::as_str)
            .unwrap_or("World")
            .to_string();
        Node::Element(Element::new("div").with_child(format!("Hello, {name}")))
    }

    fn observable_greeter_view(_cx: &mut RenderContext<'_>, props: &VmValue) -> Node {
        let name = props.get("name").map(VmValue::resolve).unwrap_or_default();
        Node::Element(Element::new("div").with_child(format!("Hello, {}", name.display_text())))
    }

    fn other_view(_cx: &mut RenderContext<'_>, _props: &VmValue) -> Node {
        Node::text("other")
    }

    struct Fixture {
        host: Host,
        element: Element,
        bindings: AppliedBindings,
    }

    fn setup(html: &str, vm: VmValue) -> Fixture {
        let host = Host::new();
        let env = BindingEnv::new(&host).unwrap();
        let element = parse_element(html).unwrap();
        let bindings = apply_bindings(&env, &element, vm).unwrap();
        Fixture {
            host,
            element,
            bindings,
        }
    }

    fn greeter() -> ComponentRef {
        ComponentRef::new("Greeter", greeter_view)
    }

    #[test]
    fn renders_the_component() {
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: Greeter }"></div>"#,
            VmValue::object([("Greeter", VmValue::from(greeter()))]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, World");
        assert_eq!(fixture.host.mounted_count(), 1);
    }

    #[test]
    fn accepts_props() {
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: Greeter, props: { name: 'Mark' } }"></div>"#,
            VmValue::object([("Greeter", VmValue::from(greeter()))]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, Mark");
    }

    #[test]
    fn accepts_params_for_backwards_compatibility() {
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: Greeter, params: { name: 'Mark' } }"></div>"#,
            VmValue::object([("Greeter", VmValue::from(greeter()))]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, Mark");
    }

    #[test]
    fn props_can_be_an_observable() {
        let props = Observable::new(VmValue::object([("name", VmValue::from("Susan"))]));
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: Greeter, props: props }"></div>"#,
            VmValue::object([("Greeter", VmValue::from(greeter())), ("props", VmValue::from(props.clone()))]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, Susan");

        props.set(VmValue::object([("name", VmValue::from("Susie"))]));
        assert_eq!(fixture.element.text_content(), "Hello, Susie");
        assert_eq!(fixture.host.mounted_count(), 1);
    }

    #[test]
    fn observables_inside_props_do_not_rerender() {
        let name = Observable::new(VmValue::from("John"));
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: ObservableGreeter, props: props }"></div>"#,
            VmValue::object([
                ("ObservableGreeter", VmValue::from(ComponentRef::new("ObservableGreeter", observable_greeter_view))),
                ("props", VmValue::object([("name", VmValue::from(name.clone()))])),
            ]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, John");

        name.set(VmValue::from("Jonny"));
        fixture.host.flush().unwrap();
        assert_eq!(fixture.element.text_content(), "Hello, John");
        assert_eq!(name.subscription_count(), 0);
    }

    #[test]
    fn renders_with_shorthand_notation() {
        let fixture = setup(
            r#"<div><!-- react: Greeter {name: "Joe"} --></div>"#,
            VmValue::object([("Greeter", VmValue::from(greeter()))]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, Joe");
        assert_eq!(fixture.bindings.len(), 1);
    }

    #[test]
    fn shorthand_uses_configured_handler_name() {
        let host = Host::with_config(BridgeConfig {
            binding_handler_name: "component".to_string(),
            ..BridgeConfig::default()
        });
        let env = BindingEnv::new(&host).unwrap();
        let element = parse_element(r#"<section><!-- react: Greeter {name: "Ada"} --></section>"#).unwrap();

        let _bindings = apply_bindings(&env, &element, VmValue::object([("Greeter", VmValue::from(greeter()))])).unwrap();
        assert_eq!(element.text_content(), "Hello, Ada");
        assert!(env.handler("reactComponent").is_none());
    }

    #[test]
    fn shorthand_can_be_turned_off() {
        let host = Host::with_config(BridgeConfig {
            shorthand_syntax: false,
            ..BridgeConfig::default()
        });
        let env = BindingEnv::new(&host).unwrap();
        let element = parse_element(r#"<div><!-- react: Greeter {name: "Joe"} --></div>"#).unwrap();

        let bindings = apply_bindings(&env, &element, VmValue::object([("Greeter", VmValue::from(greeter()))])).unwrap();
        assert!(bindings.is_empty());
        assert_eq!(element.text_content(), "");
    }

    #[test]
    fn missing_component_fails_at_bind_time() {
        let host = Host::new();
        let env = BindingEnv::new(&host).unwrap();
        let element = parse_element(r#"<div data-bind="reactComponent: { props: {} }"></div>"#).unwrap();

        let err = apply_bindings(&env, &element, VmValue::empty_object()).unwrap_err();
        assert!(matches!(err, BridgeError::MissingComponent { handler } if handler == "reactComponent"));
        assert_eq!(host.mounted_count(), 0);
    }

    #[test]
    fn swapping_components_remounts() {
        let which = Observable::new(VmValue::from(greeter()));
        let other = ComponentRef::new("Other", other_view);
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: which }"></div>"#,
            VmValue::object([("which", VmValue::from(which.clone()))]),
        );
        assert_eq!(fixture.element.text_content(), "Hello, World");

        which.set(VmValue::from(other));
        assert_eq!(fixture.element.text_content(), "other");
        assert_eq!(fixture.host.mounted_count(), 1);
    }

    #[test]
    fn disposal_unmounts_the_component() {
        let fixture = setup(
            r#"<div data-bind="reactComponent: { Component: Greeter }"></div>"#,
            VmValue::object([("Greeter", VmValue::from(greeter()))]),
        );
        let Fixture {
            host,
            element,
            bindings,
        } = fixture;

        bindings.dispose();
        assert_eq!(host.mounted_count(), 0);
        assert!(!element.has_mounted_view());
    }
}
