//! Observable-bound markup.
//!
//! The adapters between bound markup and components:
//!
//! - [`apply_bindings`] binds a markup tree to a view model.
//! - The component binding handler mounts a component inside bound markup,
//!   optionally written with the shorthand comment syntax
//!   `<!-- react: Name props -->`.
//! - [`use_knockout_bindings`] and [`knockout_template`] embed bound markup
//!   and templates inside a component.
//!
//! # Example
//!
//! ```rust,ignore
//! let host = Host::new();
//! let env = BindingEnv::new(&host)?;
//!
//! let greeter = ComponentRef::new("Greeter", |_, props| {
//!     let name = props.get("name").and_then(VmValue::as_str).unwrap_or("World");
//!     Node::text(format!("Hello, {name}"))
//! });
//!
//! let element = parse_element(r#"<div><!-- react: Greeter { name: "Joe" } --></div>"#)?;
//! let _bindings = apply_bindings(&env, &element, VmValue::object([("Greeter", greeter.into())]))?;
//! assert_eq!(element.text_content(), "Hello, Joe");
//! ```

mod binding;
pub mod expr;
pub mod handlers;
pub mod parse;
pub mod preprocess;
mod template;
mod value;

pub use binding::{
    apply_bindings, apply_bindings_to_descendants, AppliedBindings, BindingContext, BindingEnv,
    BindingHandler, ElementBinding,
};
pub use expr::{parse_bindings, Bindings, Expr};
pub use handlers::{ComponentHandler, TemplateHandler, TextHandler};
pub use parse::{parse_element, parse_fragment};
pub use preprocess::{NodePreprocessor, PreprocessorChain, ShorthandSyntax};
pub use template::{knockout_template, use_knockout_bindings, TemplateProps, TemplateRegistry};
pub use value::{ComponentFn, ComponentRef, VmValue};
