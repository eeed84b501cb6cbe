//! Node preprocessing.
//!
//! Before bindings are applied to an element's children, each child is
//! offered to a [`PreprocessorChain`], which may replace it with other
//! nodes. The chain is an explicit list built at setup time: the step
//! installed last is asked first, and a step that declines falls through to
//! the one installed before it.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::dom::{Element, Node};
use crate::error::{BridgeError, Result};

/// One step of a [`PreprocessorChain`].
pub trait NodePreprocessor: Send + Sync {
    /// Unique name of the step within a chain.
    fn name(&self) -> &str;

    /// Nodes to put in place of `node`, or `None` to decline.
    fn preprocess(&self, node: &Node) -> Option<Vec<Node>>;
}

/// Ordered preprocessing steps.
#[derive(Clone, Default)]
pub struct PreprocessorChain {
    steps: Vec<Arc<dyn NodePreprocessor>>,
}

impl PreprocessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step in front of the existing ones.
    pub fn install<P>(&mut self, step: P) -> Result<()>
    where
        P: NodePreprocessor + 'static,
    {
        if self.is_installed(step.name()) {
            return Err(BridgeError::PreprocessorAlreadyInstalled(step.name().to_string()));
        }
        tracing::debug!(name = step.name(), "installed preprocessor");
        self.steps.push(Arc::new(step));
        Ok(())
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.steps.iter().any(|step| step.name() == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run `node` through the chain, latest step first.
    pub fn preprocess(&self, node: &Node) -> Option<Vec<Node>> {
        self.steps.iter().rev().find_map(|step| step.preprocess(node))
    }
}

impl fmt::Debug for PreprocessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|step| step.name()))
            .finish()
    }
}

const SHORTHAND_PATTERN: &str = r"^\s*react\s*:\s*([\w.]+)\s+([\s\S]+?)\s*$";

/// Rewrites `<!-- react: Name props -->` into an element carrying the
/// component binding.
pub struct ShorthandSyntax {
    handler_name: String,
    pattern: Regex,
}

impl ShorthandSyntax {
    pub const NAME: &'static str = "component-shorthand";

    /// A rewriter producing bindings for the handler named `handler_name`.
    pub fn new(handler_name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            handler_name: handler_name.into(),
            pattern: Regex::new(SHORTHAND_PATTERN)?,
        })
    }
}

impl NodePreprocessor for ShorthandSyntax {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn preprocess(&self, node: &Node) -> Option<Vec<Node>> {
        let Node::Comment(text) = node else {
            return None;
        };
        let captures = self.pattern.captures(text)?;
        let component = captures.get(1)?.as_str();
        let props = captures.get(2)?.as_str();

        let binding = format!(
            "{}: {{ Component: {component}, props: {props} }}",
            self.handler_name
        );
        tracing::trace!(component, "rewrote shorthand comment");
        Some(vec![Node::Element(
            Element::new("div").with_attr("data-bind", binding),
        )])
    }
}
