//! View-model values.
//!
//! Bound markup reads its data from a [`VmValue`] tree. Plain values come
//! from Rust code or JSON; observables make parts of the tree live, and
//! component references let markup mount components by name.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::component::RenderContext;
use crate::dom::Node;
use crate::observable::Observable;

/// Render function of a component that can be mounted from markup.
pub type ComponentFn = dyn Fn(&mut RenderContext<'_>, &VmValue) -> Node + Send + Sync;

/// A named function component taking its props as a [`VmValue`].
///
/// Two references are equal only if they share the same render function.
#[derive(Clone)]
pub struct ComponentRef {
    name: Arc<str>,
    render: Arc<ComponentFn>,
}

impl ComponentRef {
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &VmValue) -> Node + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            render: Arc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, cx: &mut RenderContext<'_>, props: &VmValue) -> Node {
        (self.render)(cx, props)
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

/// A value in a view model.
///
/// Structural equality for plain data; observables and components compare
/// by identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VmValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<VmValue>),
    Object(IndexMap<String, VmValue>),
    Observable(Observable<VmValue>),
    Component(ComponentRef),
}

impl VmValue {
    /// An object from key/value pairs, in order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, VmValue)>,
    {
        VmValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// An empty object.
    pub fn empty_object() -> Self {
        VmValue::Object(IndexMap::new())
    }

    /// A new observable holding `value`.
    pub fn observable(value: VmValue) -> Self {
        VmValue::Observable(Observable::new(value))
    }

    /// The value itself, or the current value of an observable. Reading an
    /// observable this way records a dependency.
    pub fn resolve(&self) -> VmValue {
        match self {
            VmValue::Observable(observable) => observable.get(),
            other => other.clone(),
        }
    }

    /// Property `key` of an object; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&VmValue> {
        match self {
            VmValue::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, VmValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VmValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VmValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VmValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_observable(&self) -> Option<&Observable<VmValue>> {
        match self {
            VmValue::Observable(observable) => Some(observable),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            VmValue::Component(component) => Some(component),
            _ => None,
        }
    }

    /// Text shown for this value by the `text` binding. Null renders as
    /// nothing and whole numbers without a fraction.
    pub fn display_text(&self) -> String {
        match self {
            VmValue::Null => String::new(),
            VmValue::Bool(b) => b.to_string(),
            VmValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            VmValue::Number(n) => n.to_string(),
            VmValue::String(s) => s.clone(),
            VmValue::Array(items) => items
                .iter()
                .map(VmValue::display_text)
                .collect::<Vec<_>>()
                .join(","),
            VmValue::Object(_) => "[object Object]".to_string(),
            VmValue::Observable(observable) => observable.peek().display_text(),
            VmValue::Component(component) => component.name().to_string(),
        }
    }
}

impl From<serde_json::Value> for VmValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => VmValue::Null,
            Value::Bool(b) => VmValue::Bool(b),
            Value::Number(n) => VmValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => VmValue::String(s),
            Value::Array(items) => VmValue::Array(items.into_iter().map(VmValue::from).collect()),
            Value::Object(entries) => VmValue::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, VmValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for VmValue {
    fn from(value: &str) -> Self {
        VmValue::String(value.to_string())
    }
}

impl From<String> for VmValue {
    fn from(value: String) -> Self {
        VmValue::String(value)
    }
}

impl From<bool> for VmValue {
    fn from(value: bool) -> Self {
        VmValue::Bool(value)
    }
}

impl From<f64> for VmValue {
    fn from(value: f64) -> Self {
        VmValue::Number(value)
    }
}

impl From<i64> for VmValue {
    fn from(value: i64) -> Self {
        VmValue::Number(value as f64)
    }
}

impl From<Observable<VmValue>> for VmValue {
    fn from(value: Observable<VmValue>) -> Self {
        VmValue::Observable(value)
    }
}

impl From<ComponentRef> for VmValue {
    fn from(value: ComponentRef) -> Self {
        VmValue::Component(value)
    }
}

impl From<IndexMap<String, VmValue>> for VmValue {
    fn from(value: IndexMap<String, VmValue>) -> Self {
        VmValue::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blank(_: &mut RenderContext<'_>, _: &VmValue) -> Node {
        Node::empty()
    }

    #[test]
    fn converts_json() {
        let value = VmValue::from(json!({ "name": "Mark", "age": 40, "tags": ["a", true, null] }));

        assert_eq!(value.get("name").and_then(VmValue::as_str), Some("Mark"));
        assert_eq!(value.get("age").and_then(VmValue::as_f64), Some(40.0));
        assert_eq!(
            value.get("tags"),
            Some(&VmValue::Array(vec!["a".into(), true.into(), VmValue::Null]))
        );
    }

    #[test]
    fn plain_data_compares_structurally() {
        assert_eq!(VmValue::empty_object(), VmValue::empty_object());
        assert_eq!(
            VmValue::object([("name", VmValue::from("a"))]),
            VmValue::object([("name", VmValue::from("a"))])
        );
    }

    #[test]
    fn observables_and_components_compare_by_identity() {
        let a = Observable::new(VmValue::Null);
        assert_eq!(VmValue::from(a.clone()), VmValue::from(a));
        assert_ne!(VmValue::observable(VmValue::Null), VmValue::observable(VmValue::Null));

        let greeter = ComponentRef::new("Greeter", blank);
        assert_eq!(greeter, greeter.clone());
        assert_ne!(greeter, ComponentRef::new("Greeter", blank));
    }

    #[test]
    fn display_text_matches_binding_output() {
        assert_eq!(VmValue::Null.display_text(), "");
        assert_eq!(VmValue::from(3.0).display_text(), "3");
        assert_eq!(VmValue::from(2.5).display_text(), "2.5");
        assert_eq!(VmValue::observable("hi".into()).display_text(), "hi");
    }
}
