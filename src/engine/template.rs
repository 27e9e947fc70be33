//! Template - Markup compiled to render functions.
//!
//! Supported markup:
//! - elements, void elements, self-closing tags, comments
//! - `{{ path }}` interpolation
//! - static attributes, `:name` / `v-bind:name` bound attributes
//! - `v-name[:arg]` directives
//! - `<slot name="x">fallback</slot>` outlets, with bound attributes as slot props
//! - `<template #name="props">` / `v-slot:name` slot content
//!
//! Expressions are string/number/boolean literals or dotted paths resolved
//! through a [`Scope`]. There is no `v-if`/`v-for` and no arbitrary code.

use std::rc::Rc;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::component::RenderFn;
use super::dom::is_void_element;
use super::instance::RenderContext;
use super::vnode::{DirectiveUse, ElementVNode, VNode};
use crate::error::TemplateError;
use crate::types::{PropsMap, Value};

/// Name resolution for template expressions.
pub trait Scope {
    fn lookup(&self, path: &str) -> Option<Value>;

    fn render_slot(&self, name: &str, props: &PropsMap) -> Vec<VNode>;
}

/// Slot props as a scope: keys resolve directly.
impl Scope for PropsMap {
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let head = segments.next()?;
        self.get(head)?.get_path(segments).cloned()
    }

    fn render_slot(&self, _name: &str, _props: &PropsMap) -> Vec<VNode> {
        Vec::new()
    }
}

/// Slot props bound to a name (`#default="item"` → `item.label`).
struct BoundScope<'a> {
    binding: &'a str,
    props: &'a PropsMap,
}

impl Scope for BoundScope<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            Some((head, rest)) if head == self.binding => self.props.lookup(rest),
            None if path == self.binding => Some(Value::Map(self.props.clone())),
            _ => self.props.lookup(path),
        }
    }

    fn render_slot(&self, _name: &str, _props: &PropsMap) -> Vec<VNode> {
        Vec::new()
    }
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Open {
        tag: &'a str,
        attrs: Vec<(&'a str, Option<&'a str>)>,
        self_closing: bool,
    },
    Close(&'a str),
    Text(&'a str),
    Comment,
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')),
    ))(input)
}

fn attr_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'' | '<'))(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(
        attr_name,
        opt(preceded(tuple((multispace0, char('='), multispace0)), quoted)),
    )(input)
}

fn open_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(
        tuple((
            char('<'),
            tag_name,
            many0(preceded(multispace1, attribute)),
            multispace0,
            opt(char('/')),
            char('>'),
        )),
        |(_, tag, attrs, _, slash, _)| Token::Open {
            tag,
            attrs,
            self_closing: slash.is_some(),
        },
    )(input)
}

fn close_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("</"), tag_name, pair(multispace0, char('>'))),
        Token::Close,
    )(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
    map(delimited(tag("<!--"), take_until("-->"), tag("-->")), |_| {
        Token::Comment
    })(input)
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
    map(take_while1(|c: char| c != '<'), Token::Text)(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((comment, close_tag, open_tag, text))(input)
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut input = source;
    let mut tokens = Vec::new();
    while !input.is_empty() {
        match token(input) {
            Ok((rest, token)) => {
                tokens.push(token);
                input = rest;
            }
            Err(_) => {
                let snippet: String = input.chars().take(16).collect();
                return Err(TemplateError::Syntax {
                    offset: source.len() - input.len(),
                    message: format!("unexpected input near `{snippet}`"),
                });
            }
        }
    }
    Ok(tokens)
}

// =============================================================================
// Tree
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TextPart {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Attr {
    Static { name: String, value: String },
    Bound { name: String, expr: String },
    Directive { name: String, arg: Option<String>, expr: Option<String> },
    SlotScope { slot: String, binding: Option<String> },
    /// `@event` / `v-on:event`; listeners are not rendered.
    Listener,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element {
        tag: String,
        attrs: Vec<Attr>,
        children: Vec<Node>,
    },
    Text(Vec<TextPart>),
}

fn classify_attr((name, value): (&str, Option<&str>)) -> Attr {
    let value = value.map(str::to_string);
    if let Some(slot) = name.strip_prefix('#') {
        return Attr::SlotScope {
            slot: slot.to_string(),
            binding: value,
        };
    }
    if let Some(rest) = name.strip_prefix("v-slot") {
        let slot = rest.strip_prefix(':').unwrap_or("default");
        return Attr::SlotScope {
            slot: if slot.is_empty() { "default" } else { slot }.to_string(),
            binding: value,
        };
    }
    if name.starts_with('@') || name.starts_with("v-on:") {
        return Attr::Listener;
    }
    if let Some(bound) = name.strip_prefix(':').or_else(|| name.strip_prefix("v-bind:")) {
        return Attr::Bound {
            name: bound.to_string(),
            expr: value.unwrap_or_default(),
        };
    }
    if let Some(directive) = name.strip_prefix("v-") {
        let (name, arg) = match directive.split_once(':') {
            Some((name, arg)) => (name, Some(arg.to_string())),
            None => (directive, None),
        };
        return Attr::Directive {
            name: name.to_string(),
            arg,
            expr: value,
        };
    }
    Attr::Static {
        name: name.to_string(),
        value: value.unwrap_or_default(),
    }
}

fn condense_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn parse_interpolation(text: &str) -> Result<Vec<TextPart>, TemplateError> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            parts.push(TextPart::Literal(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(TemplateError::UnterminatedInterpolation {
                text: text.to_string(),
            });
        };
        parts.push(TextPart::Expr(after[..end].trim().to_string()));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        parts.push(TextPart::Literal(rest.to_string()));
    }
    Ok(parts)
}

/// Whitespace-only text spanning lines is dropped; other runs are condensed.
fn text_node(raw: &str) -> Result<Option<Node>, TemplateError> {
    if raw.trim().is_empty() && raw.contains('\n') {
        return Ok(None);
    }
    let parts = parse_interpolation(&condense_whitespace(raw))?;
    Ok(Some(Node::Text(parts)))
}

struct OpenElement {
    tag: String,
    attrs: Vec<Attr>,
    children: Vec<Node>,
}

fn push_node(stack: &mut [OpenElement], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(open) => open.children.push(node),
        None => roots.push(node),
    }
}

fn build_tree(tokens: Vec<Token<'_>>) -> Result<Vec<Node>, TemplateError> {
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut roots = Vec::new();

    for token in tokens {
        match token {
            Token::Comment => {}
            Token::Text(raw) => {
                if let Some(node) = text_node(raw)? {
                    push_node(&mut stack, &mut roots, node);
                }
            }
            Token::Open {
                tag,
                attrs,
                self_closing,
            } => {
                let attrs = attrs.into_iter().map(classify_attr).collect();
                if self_closing || is_void_element(tag) {
                    let node = Node::Element {
                        tag: tag.to_string(),
                        attrs,
                        children: Vec::new(),
                    };
                    push_node(&mut stack, &mut roots, node);
                } else {
                    stack.push(OpenElement {
                        tag: tag.to_string(),
                        attrs,
                        children: Vec::new(),
                    });
                }
            }
            Token::Close(tag) => {
                let Some(open) = stack.pop() else {
                    return Err(TemplateError::Syntax {
                        offset: 0,
                        message: format!("unexpected closing tag </{tag}>"),
                    });
                };
                if open.tag != tag {
                    return Err(TemplateError::MismatchedClose {
                        expected: open.tag,
                        found: tag.to_string(),
                    });
                }
                let node = Node::Element {
                    tag: open.tag,
                    attrs: open.attrs,
                    children: open.children,
                };
                push_node(&mut stack, &mut roots, node);
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(TemplateError::UnclosedElement { tag: open.tag });
    }
    Ok(roots)
}

fn is_blank(node: &Node) -> bool {
    match node {
        Node::Text(parts) => parts
            .iter()
            .all(|part| matches!(part, TextPart::Literal(s) if s.trim().is_empty())),
        Node::Element { .. } => false,
    }
}

/// `<template #name="binding">` → `(name, binding, children)`.
fn slot_template(node: &Node) -> Option<(&str, Option<&str>, &[Node])> {
    let Node::Element { tag, attrs, children } = node else {
        return None;
    };
    if tag != "template" {
        return None;
    }
    attrs.iter().find_map(|attr| match attr {
        Attr::SlotScope { slot, binding } => Some((slot.as_str(), binding.as_deref(), children.as_slice())),
        _ => None,
    })
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate a template expression: a quoted string, a number, `true`,
/// `false`, `null`, or a dotted path looked up in `scope`.
pub fn evaluate(expr: &str, scope: &dyn Scope) -> Value {
    let expr = expr.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = expr.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return Value::Str(inner.to_string());
        }
    }
    if let Ok(int) = expr.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = expr.parse::<f64>() {
        return Value::Float(float);
    }
    match expr {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" | "undefined" => Value::Null,
        path => scope.lookup(path).unwrap_or_default(),
    }
}

fn render_nodes(nodes: &[Node], scope: &dyn Scope) -> Vec<VNode> {
    nodes.iter().flat_map(|node| render_node(node, scope)).collect()
}

fn render_node(node: &Node, scope: &dyn Scope) -> Vec<VNode> {
    match node {
        Node::Text(parts) => {
            let text: String = parts
                .iter()
                .map(|part| match part {
                    TextPart::Literal(literal) => literal.clone(),
                    TextPart::Expr(expr) => evaluate(expr, scope).to_string(),
                })
                .collect();
            vec![VNode::Text(text)]
        }
        Node::Element { tag, attrs, children } if tag == "slot" => {
            let mut name = "default".to_string();
            let mut props = PropsMap::new();
            for attr in attrs {
                match attr {
                    Attr::Static { name: key, value } if key == "name" => name = value.clone(),
                    Attr::Static { name: key, value } => {
                        props.insert(key.clone(), Value::Str(value.clone()));
                    }
                    Attr::Bound { name: key, expr } => {
                        props.insert(key.clone(), evaluate(expr, scope));
                    }
                    _ => {}
                }
            }
            let rendered = scope.render_slot(&name, &props);
            if rendered.is_empty() {
                render_nodes(children, scope)
            } else {
                rendered
            }
        }
        Node::Element { tag, children, .. } if tag == "template" => render_nodes(children, scope),
        Node::Element { tag, attrs, children } => vec![VNode::Element(render_element(tag, attrs, children, scope))],
    }
}

fn render_element(tag: &str, attrs: &[Attr], children: &[Node], scope: &dyn Scope) -> ElementVNode {
    let mut element = ElementVNode::new(tag);
    for attr in attrs {
        match attr {
            Attr::Static { name, value } => {
                element.attrs.insert(name.clone(), Value::Str(value.clone()));
            }
            Attr::Bound { name, expr } => {
                element.attrs.insert(name.clone(), evaluate(expr, scope));
            }
            Attr::Directive { name, arg, expr } => element.directives.push(DirectiveUse {
                name: name.clone(),
                arg: arg.clone(),
                value: expr
                    .as_deref()
                    .map(|expr| evaluate(expr, scope))
                    .unwrap_or_default(),
            }),
            Attr::SlotScope { .. } | Attr::Listener => {}
        }
    }
    for child in children {
        match slot_template(child) {
            Some((slot, _, inner)) => {
                element.named_slots.insert(slot.to_string(), render_nodes(inner, scope));
            }
            None => element.children.extend(render_node(child, scope)),
        }
    }
    element
}

// =============================================================================
// Compiled templates
// =============================================================================

#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    roots: Rc<Vec<Node>>,
    /// Name the slot props are bound to, for `<template #default="props">` sources.
    slot_binding: Option<String>,
}

/// Compile template markup.
pub fn compile(source: &str) -> Result<CompiledTemplate, TemplateError> {
    let tree = build_tree(tokenize(source)?)?;
    let roots: Vec<Node> = tree.into_iter().filter(|node| !is_blank(node)).collect();

    if let [only] = roots.as_slice() {
        if let Some((_, binding, inner)) = slot_template(only) {
            let slot_binding = binding
                .map(str::trim)
                .filter(|binding| !binding.starts_with('{'))
                .map(str::to_string);
            return Ok(CompiledTemplate {
                roots: Rc::new(inner.to_vec()),
                slot_binding,
            });
        }
    }

    Ok(CompiledTemplate {
        roots: Rc::new(roots),
        slot_binding: None,
    })
}

impl CompiledTemplate {
    /// Render every root node.
    pub fn render(&self, scope: &dyn Scope) -> Vec<VNode> {
        render_nodes(&self.roots, scope)
    }

    /// Render as a single root: one node, a fragment, or empty.
    pub fn render_root(&self, scope: &dyn Scope) -> VNode {
        let mut nodes = self.render(scope);
        match nodes.len() {
            0 => VNode::Empty,
            1 => nodes.remove(0),
            _ => VNode::Fragment(nodes),
        }
    }

    /// Render as slot content with the given slot props in scope.
    pub fn render_slot(&self, props: &PropsMap) -> Vec<VNode> {
        match &self.slot_binding {
            Some(binding) => self.render(&BoundScope { binding, props }),
            None => self.render(props),
        }
    }

    pub fn into_render_fn(self) -> RenderFn {
        Rc::new(move |ctx: &RenderContext<'_>| self.render_root(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(nodes: &[VNode]) -> String {
        nodes
            .iter()
            .map(|node| match node {
                VNode::Text(text) => text.clone(),
                VNode::Element(element) => text_of(&element.children),
                VNode::Fragment(children) => text_of(children),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_tokenize_tags_and_text() {
        let tokens = tokenize("<div id=\"a\"><br/>hi</div><!-- x -->").unwrap();
        assert_eq!(tokens.len(), 5);
        assert!(matches!(&tokens[0], Token::Open { tag: "div", attrs, self_closing: false } if attrs == &vec![("id", Some("a"))]));
        assert!(matches!(&tokens[1], Token::Open { tag: "br", self_closing: true, .. }));
        assert_eq!(tokens[2], Token::Text("hi"));
        assert_eq!(tokens[3], Token::Close("div"));
        assert_eq!(tokens[4], Token::Comment);
    }

    #[test]
    fn test_structure_errors() {
        assert_eq!(
            compile("<div><p></div>").unwrap_err(),
            TemplateError::MismatchedClose {
                expected: "p".into(),
                found: "div".into()
            }
        );
        assert_eq!(
            compile("<section>").unwrap_err(),
            TemplateError::UnclosedElement { tag: "section".into() }
        );
        assert!(matches!(compile("<p>{{ msg</p>"), Err(TemplateError::UnterminatedInterpolation { .. })));
        assert!(matches!(compile("<p>a</p></p>"), Err(TemplateError::Syntax { .. })));
    }

    #[test]
    fn test_interpolation_uses_scope() {
        let template = compile("<p>Hello {{ name }}! {{ count }}</p>").unwrap();
        let scope = crate::props! { "name" => "world", "count" => 3 };
        assert_eq!(text_of(&template.render(&scope)), "Hello world! 3");
    }

    #[test]
    fn test_bound_static_and_listener_attributes() {
        let template = compile("<input :value=\"msg\" type=\"text\" @input=\"save\" disabled>").unwrap();
        let scope = crate::props! { "msg" => "hi" };
        let VNode::Element(element) = template.render_root(&scope) else {
            panic!("expected element");
        };
        assert_eq!(element.attrs.get("value"), Some(&Value::from("hi")));
        assert_eq!(element.attrs.get("type"), Some(&Value::from("text")));
        assert_eq!(element.attrs.get("disabled"), Some(&Value::from("")));
        assert_eq!(element.attrs.len(), 3);
    }

    #[test]
    fn test_directives_are_collected() {
        let template = compile("<div v-color:bg=\"'red'\" v-focus></div>").unwrap();
        let VNode::Element(element) = template.render_root(&PropsMap::new()) else {
            panic!("expected element");
        };
        assert_eq!(element.directives.len(), 2);
        assert_eq!(element.directives[0].name, "color");
        assert_eq!(element.directives[0].arg.as_deref(), Some("bg"));
        assert_eq!(element.directives[0].value, Value::from("red"));
        assert_eq!(element.directives[1].value, Value::Null);
    }

    #[test]
    fn test_whitespace_handling() {
        let template = compile("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>").unwrap();
        let VNode::Element(list) = template.render_root(&PropsMap::new()) else {
            panic!("expected element");
        };
        assert_eq!(list.children.len(), 2);

        let inline = compile("<p>a   <b>b</b> c</p>").unwrap();
        assert_eq!(text_of(&inline.render(&PropsMap::new())), "a b c");
    }

    #[test]
    fn test_slot_outlet_falls_back() {
        let template = compile("<div><slot>fallback</slot></div>").unwrap();
        assert_eq!(text_of(&template.render(&PropsMap::new())), "fallback");
    }

    #[test]
    fn test_named_slot_templates() {
        let template = compile("<card><template #header>Title</template>Body</card>").unwrap();
        let VNode::Element(card) = template.render_root(&PropsMap::new()) else {
            panic!("expected element");
        };
        assert_eq!(text_of(&card.children), "Body");
        assert_eq!(text_of(&card.named_slots["header"]), "Title");
    }

    #[test]
    fn test_scoped_slot_binding() {
        let template = compile("<template #default=\"item\">{{ item.label }}</template>").unwrap();
        let props = crate::props! { "label" => "first" };
        assert_eq!(text_of(&template.render_slot(&props)), "first");

        let destructured = compile("<template #default=\"{ label }\">{{ label }}</template>").unwrap();
        assert_eq!(text_of(&destructured.render_slot(&props)), "first");
    }

    #[test]
    fn test_plain_text_template() {
        let template = compile("Hello").unwrap();
        assert_eq!(text_of(&template.render_slot(&PropsMap::new())), "Hello");
    }

    #[test]
    fn test_literals() {
        let scope = PropsMap::new();
        assert_eq!(evaluate("'x'", &scope), Value::from("x"));
        assert_eq!(evaluate("42", &scope), Value::Int(42));
        assert_eq!(evaluate("1.5", &scope), Value::Float(1.5));
        assert_eq!(evaluate("true", &scope), Value::Bool(true));
        assert_eq!(evaluate("missing.path", &scope), Value::Null);
    }
}
