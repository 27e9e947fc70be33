//! Selector - CSS selector parsing and matching.
//!
//! Supports what mount targets need: type selectors, `*`, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, compound selectors, and the descendant (` `)
//! and child (`>`) combinators. Matching runs right to left.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::dom::{Document, NodeId};
use crate::error::SelectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

/// One compound selector, e.g. `div.note#main[data-x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    tag: Option<String>,
    simples: Vec<SimpleSelector>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag_name) = doc.tag(node) else {
            return false;
        };
        let tag_matches = match self.tag.as_deref() {
            None | Some("*") => true,
            Some(wanted) => wanted.eq_ignore_ascii_case(tag_name),
        };
        if !tag_matches {
            return false;
        }
        self.simples.iter().all(|simple| match simple {
            SimpleSelector::Id(id) => doc.attribute(node, "id") == Some(id.as_str()),
            SimpleSelector::Class(class) => doc
                .attribute(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            SimpleSelector::Attr { name, value } => match (doc.attribute(node, name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
        })
    }
}

/// A parsed complex selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// `(combinator to the previous part, compound)`; the first combinator is unused.
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

fn attr_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        ident,
    ))(input)
}

fn simple_selector(input: &str) -> IResult<&str, SimpleSelector> {
    alt((
        map(preceded(char('#'), ident), |id: &str| {
            SimpleSelector::Id(id.to_string())
        }),
        map(preceded(char('.'), ident), |class: &str| {
            SimpleSelector::Class(class.to_string())
        }),
        map(
            delimited(
                pair(char('['), multispace0),
                pair(
                    ident,
                    opt(preceded(
                        tuple((multispace0, char('='), multispace0)),
                        attr_value,
                    )),
                ),
                pair(multispace0, char(']')),
            ),
            |(name, value): (&str, Option<&str>)| SimpleSelector::Attr {
                name: name.to_string(),
                value: value.map(str::to_string),
            },
        ),
    ))(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    let (rest, tag_name) = opt(alt((ident, tag("*"))))(input)?;
    let (rest, simples) = many0(simple_selector)(rest)?;
    if tag_name.is_none() && simples.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((
        rest,
        Compound {
            tag: tag_name.map(str::to_string),
            simples,
        },
    ))
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        map(delimited(multispace0, char('>'), multispace0), |_| {
            Combinator::Child
        }),
        map(multispace1, |_| Combinator::Descendant),
    ))(input)
}

/// Parse a selector string.
pub fn parse_selector(input: &str) -> Result<Selector, SelectorError> {
    let invalid = || SelectorError::Invalid {
        selector: input.to_string(),
    };
    let trimmed = input.trim();

    let (rest, first) = compound(trimmed).map_err(|_| invalid())?;
    let (rest, others) = many0(pair(combinator, compound))(rest).map_err(|_| invalid())?;
    if !rest.is_empty() {
        return Err(invalid());
    }

    let mut parts = vec![(Combinator::Descendant, first)];
    parts.extend(others);
    Ok(Selector { parts })
}
