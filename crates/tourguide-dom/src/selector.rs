//! CSS selector subset used by the page snapshot.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute
//! selectors (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`, optional ` i` flag),
//! `:first-child`, `:last-child`, `:only-child`, `:first-of-type`,
//! `:last-of-type`, `:nth-child(n)`, `:nth-of-type(n)`, descendant and `>`
//! combinators, and comma-separated lists. Anything else is a parse error,
//! the same way a browser rejects a malformed selector.

use thiserror::Error;

use tourguide_protocols::NodeId;

/// Selector parse failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct SelectorParseError {
    pub position: usize,
    pub message: String,
}

/// Read access to an element tree for matching.
pub trait ElementTree {
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// Element children of `parent`, or the root elements when `None`.
    fn element_children(&self, parent: Option<NodeId>) -> Vec<NodeId>;
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    /// Left-to-right compounds.
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    simples: Vec<Simple>,
}

#[derive(Debug, Clone, PartialEq)]
enum Simple {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        op: Option<(AttrOp, String)>,
        case_insensitive: bool,
    },
    Pseudo(Pseudo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild(usize),
    NthOfType(usize),
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        Parser::new(input).parse_list()
    }

    pub fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(tree, node))
    }
}

impl ComplexSelector {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        self.matches_at(tree, self.compounds.len() - 1, node)
    }

    fn matches_at<T: ElementTree + ?Sized>(&self, tree: &T, index: usize, node: NodeId) -> bool {
        if !self.compounds[index].matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(tree, index - 1, parent)),
            Combinator::Descendant => {
                let mut current = tree.parent_element(node);
                while let Some(ancestor) = current {
                    if self.matches_at(tree, index - 1, ancestor) {
                        return true;
                    }
                    current = tree.parent_element(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.simples.iter().all(|simple| simple.matches(tree, node, tag))
    }
}

impl Simple {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId, tag: &str) -> bool {
        match self {
            Simple::Id(id) => tree.attribute(node, "id") == Some(id.as_str()),
            Simple::Class(class) => tree
                .attribute(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            Simple::Attribute {
                name,
                op,
                case_insensitive,
            } => {
                let Some(actual) = tree.attribute(node, name) else {
                    return false;
                };
                match op {
                    None => true,
                    Some((op, expected)) => {
                        let (actual, expected) = if *case_insensitive {
                            (actual.to_lowercase(), expected.to_lowercase())
                        } else {
                            (actual.to_string(), expected.clone())
                        };
                        op.apply(&actual, &expected)
                    }
                }
            }
            Simple::Pseudo(pseudo) => pseudo.matches(tree, node, tag),
        }
    }
}

impl AttrOp {
    fn apply(&self, actual: &str, expected: &str) -> bool {
        match self {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
            AttrOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

impl Pseudo {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId, tag: &str) -> bool {
        let siblings = tree.element_children(tree.parent_element(node));
        let of_type: Vec<NodeId> = siblings
            .iter()
            .copied()
            .filter(|s| {
                tree.tag_name(*s)
                    .is_some_and(|t| t.eq_ignore_ascii_case(tag))
            })
            .collect();
        let position = |list: &[NodeId]| list.iter().position(|s| *s == node).map(|p| p + 1);

        match self {
            Pseudo::FirstChild => position(&siblings) == Some(1),
            Pseudo::LastChild => siblings.last() == Some(&node),
            Pseudo::OnlyChild => siblings.len() == 1 && siblings[0] == node,
            Pseudo::FirstOfType => position(&of_type) == Some(1),
            Pseudo::LastOfType => of_type.last() == Some(&node),
            Pseudo::NthChild(n) => position(&siblings) == Some(*n),
            Pseudo::NthOfType(n) => position(&of_type) == Some(*n),
        }
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            input,
        }
    }

    fn error(&self, message: impl Into<String>) -> SelectorParseError {
        SelectorParseError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorParseError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorParseError> {
        if self.input.trim().is_empty() {
            return Err(self.error("empty selector"));
        }
        let mut selectors = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.bump();
            selectors.push(self.parse_complex()?);
        }
        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected '{}'", c)));
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorParseError> {
        self.skip_whitespace();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some('+') | Some('~') => {
                    return Err(self.error("sibling combinators are not supported"));
                }
                Some(_) if had_space => combinators.push(Combinator::Descendant),
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorParseError> {
        let mut compound = Compound::default();
        let mut any = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                any = true;
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.simples.push(Simple::Id(self.parse_ident()?));
                }
                Some('.') => {
                    self.bump();
                    compound.simples.push(Simple::Class(self.parse_ident()?));
                }
                Some('[') => {
                    self.bump();
                    compound.simples.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.bump();
                    compound.simples.push(Simple::Pseudo(self.parse_pseudo()?));
                }
                _ => break,
            }
            any = true;
        }

        if !any {
            return Err(match self.peek() {
                Some(c) => self.error(format!("unexpected '{}'", c)),
                None => self.error("expected selector, found end of input"),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorParseError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                match self.bump() {
                    Some(escaped) => ident.push(escaped),
                    None => return Err(self.error("dangling escape")),
                }
            } else if is_ident_char(c) {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(ident)
    }

    fn parse_attribute(&mut self) -> Result<Simple, SelectorParseError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.bump();
                Some(AttrOp::Equals)
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.bump();
                self.expect('=')?;
                Some(match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                })
            }
            Some(c) => return Err(self.error(format!("unexpected '{}' in attribute", c))),
            None => return Err(self.error("unterminated attribute selector")),
        };

        let Some(op) = op else {
            self.expect(']')?;
            return Ok(Simple::Attribute {
                name,
                op: None,
                case_insensitive: false,
            });
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => match self.bump() {
                            Some(c) => value.push(c),
                            None => return Err(self.error("dangling escape")),
                        },
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();

        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i') | Some('I')) {
            self.bump();
            case_insensitive = true;
            self.skip_whitespace();
        }
        self.expect(']')?;

        Ok(Simple::Attribute {
            name,
            op: Some((op, value)),
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<Pseudo, SelectorParseError> {
        let start = self.pos;
        let name = self.parse_ident()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "first-child" => Pseudo::FirstChild,
            "last-child" => Pseudo::LastChild,
            "only-child" => Pseudo::OnlyChild,
            "first-of-type" => Pseudo::FirstOfType,
            "last-of-type" => Pseudo::LastOfType,
            "nth-child" => Pseudo::NthChild(self.parse_index_argument()?),
            "nth-of-type" => Pseudo::NthOfType(self.parse_index_argument()?),
            other => {
                self.pos = start;
                return Err(self.error(format!("unsupported pseudo-class ':{}'", other)));
            }
        };
        Ok(pseudo)
    }

    fn parse_index_argument(&mut self) -> Result<usize, SelectorParseError> {
        self.expect('(')?;
        self.skip_whitespace();
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.bump();
        }
        self.skip_whitespace();
        self.expect(')')?;
        match digits.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.error("expected a positive integer index")),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
