//! Markup parsing.
//!
//! Just enough HTML for templates and bound markup: elements with quoted or
//! bare attributes, self-closing and void elements, text and comments. No
//! scripts, no implied end tags.

use crate::dom::{Element, Node};
use crate::error::{BridgeError, Result};

const VOID_ELEMENTS: &[&str] = &["area", "br", "col", "hr", "img", "input", "link", "meta"];

/// Parse markup into a list of top-level nodes.
pub fn parse_fragment(src: &str) -> Result<Vec<Node>> {
    let mut parser = MarkupParser { src, pos: 0 };
    let mut roots = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    while !parser.at_end() {
        let node = if parser.rest().starts_with("<!--") {
            Some(parser.comment()?)
        } else if parser.rest().starts_with("</") {
            let offset = parser.pos;
            let tag = parser.closing_tag()?;
            match open.pop() {
                Some(element) if element.tag() == tag => {
                    let node = Node::Element(element);
                    match open.last() {
                        Some(parent) => parent.append(node),
                        None => roots.push(node),
                    }
                    None
                }
                _ => {
                    return Err(BridgeError::MarkupSyntax {
                        offset,
                        reason: format!("unexpected closing tag </{tag}>"),
                    })
                }
            }
        } else if parser.rest().starts_with('<') {
            let (element, closed) = parser.opening_tag()?;
            if closed {
                Some(Node::Element(element))
            } else {
                open.push(element);
                None
            }
        } else {
            Some(Node::Text(parser.text()))
        };

        if let Some(node) = node {
            match open.last() {
                Some(parent) => parent.append(node),
                None => roots.push(node),
            }
        }
    }

    if let Some(element) = open.last() {
        return Err(BridgeError::MarkupSyntax {
            offset: src.len(),
            reason: format!("unclosed <{}>", element.tag()),
        });
    }
    Ok(roots)
}

/// Parse markup that must contain exactly one root element (surrounding
/// whitespace is ignored).
pub fn parse_element(src: &str) -> Result<Element> {
    let mut elements = parse_fragment(src.trim())?
        .into_iter()
        .filter(|node| !matches!(node, Node::Text(text) if text.trim().is_empty()));

    match (elements.next(), elements.next()) {
        (Some(Node::Element(element)), None) => Ok(element),
        _ => Err(BridgeError::MarkupSyntax {
            offset: 0,
            reason: "expected exactly one root element".to_string(),
        }),
    }
}

struct MarkupParser<'a> {
    src: &'a str,
    pos: usize,
}

impl MarkupParser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn error(&self, reason: impl Into<String>) -> BridgeError {
        BridgeError::MarkupSyntax {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn text(&mut self) -> String {
        let end = self.rest().find('<').unwrap_or(self.rest().len());
        let text = decode_entities(&self.rest()[..end]);
        self.pos += end;
        text
    }

    fn comment(&mut self) -> Result<Node> {
        let body_start = self.pos + 4;
        match self.src[body_start..].find("-->") {
            Some(len) => {
                let body = self.src[body_start..body_start + len].to_string();
                self.pos = body_start + len + 3;
                Ok(Node::Comment(body))
            }
            None => Err(self.error("unterminated comment")),
        }
    }

    fn name(&mut self) -> String {
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
            .unwrap_or(self.rest().len());
        let name = self.rest()[..len].to_ascii_lowercase();
        self.pos += len;
        name
    }

    fn closing_tag(&mut self) -> Result<String> {
        self.pos += 2;
        let tag = self.name();
        self.skip_ws();
        if !self.rest().starts_with('>') {
            return Err(self.error("expected '>'"));
        }
        self.pos += 1;
        Ok(tag)
    }

    /// Returns the element and whether it is already closed.
    fn opening_tag(&mut self) -> Result<(Element, bool)> {
        self.pos += 1;
        let tag = self.name();
        if tag.is_empty() {
            return Err(self.error("expected a tag name"));
        }
        let element = Element::new(tag.clone());

        loop {
            self.skip_ws();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((element, true));
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                return Ok((element, VOID_ELEMENTS.contains(&tag.as_str())));
            }
            if self.at_end() {
                return Err(self.error(format!("unterminated <{tag}>")));
            }

            let name = self.name();
            if name.is_empty() {
                return Err(self.error("expected an attribute name"));
            }
            self.skip_ws();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_ws();
                self.attr_value()?
            } else {
                String::new()
            };
            element.set_attr(name, value);
        }
    }

    fn attr_value(&mut self) -> Result<String> {
        match self.rest().chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos + 1;
                match self.src[start..].find(quote) {
                    Some(len) => {
                        self.pos = start + len + 1;
                        Ok(decode_entities(&self.src[start..start + len]))
                    }
                    None => Err(self.error("unterminated attribute value")),
                }
            }
            Some(_) => {
                let len = self
                    .rest()
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(self.rest().len());
                let value = decode_entities(&self.rest()[..len]);
                self.pos += len;
                Ok(value)
            }
            None => Err(self.error("expected an attribute value")),
        }
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_text() {
        let element = parse_element(
            r#"
            <div class="greeting">Hello, <span data-bind="text: name"></span>!</div>
        "#,
        )
        .unwrap();

        assert_eq!(element.tag(), "div");
        assert_eq!(element.attr("class").as_deref(), Some("greeting"));
        let children = element.children();
        assert_eq!(children.len(), 3);
        let span = children[1].as_element().unwrap();
        assert_eq!(span.attr("data-bind").as_deref(), Some("text: name"));
    }

    #[test]
    fn keeps_comments_and_void_elements() {
        let nodes = parse_fragment("<br><!-- react: Greeter {name: \"Joe\"} --><img src=a.png/>").unwrap();

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], Node::Comment(" react: Greeter {name: \"Joe\"} ".to_string()));
        assert_eq!(
            nodes[2].as_element().and_then(|img| img.attr("src")).as_deref(),
            Some("a.png/")
        );
    }

    #[test]
    fn multiline_attribute_values() {
        let element = parse_element("<div data-bind='template: {\n  name: name\n}'></div>").unwrap();
        assert_eq!(
            element.attr("data-bind").as_deref(),
            Some("template: {\n  name: name\n}")
        );
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(matches!(
            parse_fragment("<div><span></div>"),
            Err(BridgeError::MarkupSyntax { offset: 11, .. })
        ));
        assert!(matches!(
            parse_fragment("<div>"),
            Err(BridgeError::MarkupSyntax { .. })
        ));
        assert!(parse_element("<p></p><p></p>").is_err());
    }

    #[test]
    fn decodes_entities() {
        let nodes = parse_fragment("a &lt;b&gt; &amp; c").unwrap();
        assert_eq!(nodes, vec![Node::Text("a <b> & c".to_string())]);
    }
}
