//! Generate test strings from a recipe over named character sets.
//!
//! Ingredients name sets of strings: whitespace separated items, where an
//! item `X-Y` of two single characters is the inclusive range `X..=Y`.
//! A recipe combines ingredients:
//!
//! ```text
//! alternation := sequence ('|' sequence)*
//! sequence    := term*
//! term        := atom ('?' | '{n}' | '{n,m}')?
//! atom        := NAME | '(' alternation ')'
//! ```
//!
//! Every string the recipe can produce is generated, in order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Upper bound on generated strings.
pub const MAX_STRINGS: usize = 100_000;

/// One named ingredient: a whitespace separated string or a list of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ingredient {
    /// Whitespace separated items.
    Items(String),
    /// Explicit list of items.
    List(Vec<String>),
}

/// Ingredient name to ingredient.
pub type Ingredients = BTreeMap<String, Ingredient>;

impl Ingredient {
    fn expand(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            Self::Items(items) => items.split_whitespace().collect(),
            Self::List(items) => items.iter().map(String::as_str).collect(),
        };
        let mut out = Vec::new();
        for item in items {
            let chars: Vec<char> = item.chars().collect();
            match chars.as_slice() {
                [first, '-', last] if first <= last => {
                    out.extend((*first..=*last).map(String::from));
                }
                _ => out.push(item.to_string()),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    Open,
    Close,
    Bar,
    Optional,
    Repeat(usize, usize),
}

#[derive(Debug, Clone)]
enum Node {
    Items(Vec<String>),
    Sequence(Vec<Node>),
    Choice(Vec<Node>),
    Repeat(Box<Node>, usize, usize),
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '|' | '?' | '{' | '}')
}

fn tokenize(recipe: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = recipe.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '|' | '?' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    '|' => Token::Bar,
                    _ => Token::Optional,
                });
            }
            '{' => {
                chars.next();
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => body.push(c),
                        None => return Err(Error::pattern(recipe, "unterminated '{'")),
                    }
                }
                let bad = || Error::pattern(recipe, format!("bad repetition '{{{body}}}'"));
                let (min, max) = match body.split_once(',') {
                    Some((min, max)) => (min.trim().parse(), max.trim().parse()),
                    None => (body.trim().parse(), body.trim().parse()),
                };
                let (min, max): (usize, usize) = (min.map_err(|_| bad())?, max.map_err(|_| bad())?);
                if min > max {
                    return Err(bad());
                }
                if max > MAX_STRINGS {
                    return Err(Error::pattern(
                        recipe,
                        format!("repetition '{{{body}}}' allows more than {MAX_STRINGS} copies"),
                    ));
                }
                tokens.push(Token::Repeat(min, max));
            }
            '}' => return Err(Error::pattern(recipe, "unexpected '}'")),
            _ => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if is_special(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token::Name(name));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    recipe: &'a str,
    ingredients: &'a Ingredients,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn alternation(&mut self) -> Result<Node> {
        let mut choices = vec![self.sequence()?];
        while self.peek() == Some(&Token::Bar) {
            self.pos += 1;
            choices.push(self.sequence()?);
        }
        Ok(if choices.len() == 1 {
            choices.remove(0)
        } else {
            Node::Choice(choices)
        })
    }

    fn sequence(&mut self) -> Result<Node> {
        let mut terms = Vec::new();
        while matches!(self.peek(), Some(Token::Name(_) | Token::Open)) {
            terms.push(self.term()?);
        }
        Ok(Node::Sequence(terms))
    }

    fn term(&mut self) -> Result<Node> {
        let atom = match self.tokens.get(self.pos).cloned() {
            Some(Token::Name(name)) => {
                self.pos += 1;
                let ingredient = self.ingredients.get(&name).ok_or_else(|| {
                    Error::pattern(self.recipe, format!("unknown ingredient '{name}'"))
                })?;
                Node::Items(ingredient.expand())
            }
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.alternation()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(Error::pattern(self.recipe, "missing ')'"));
                }
                self.pos += 1;
                inner
            }
            _ => return Err(Error::pattern(self.recipe, "expected a name or '('")),
        };
        Ok(match self.peek() {
            Some(Token::Optional) => {
                self.pos += 1;
                Node::Repeat(Box::new(atom), 0, 1)
            }
            Some(&Token::Repeat(min, max)) => {
                self.pos += 1;
                Node::Repeat(Box::new(atom), min, max)
            }
            _ => atom,
        })
    }
}

fn product(recipe: &str, left: &[String], right: &[String]) -> Result<Vec<String>> {
    if left.len().saturating_mul(right.len()) > MAX_STRINGS {
        return Err(Error::pattern(
            recipe,
            format!("generates more than {MAX_STRINGS} strings"),
        ));
    }
    Ok(left
        .iter()
        .flat_map(|l| right.iter().map(move |r| format!("{l}{r}")))
        .collect())
}

fn expand(recipe: &str, node: &Node) -> Result<Vec<String>> {
    match node {
        Node::Items(items) => Ok(items.clone()),
        Node::Sequence(terms) => {
            let mut acc = vec![String::new()];
            for term in terms {
                acc = product(recipe, &acc, &expand(recipe, term)?)?;
            }
            Ok(acc)
        }
        Node::Choice(choices) => {
            let mut out = Vec::new();
            for choice in choices {
                out.extend(expand(recipe, choice)?);
                if out.len() > MAX_STRINGS {
                    return Err(Error::pattern(
                        recipe,
                        format!("generates more than {MAX_STRINGS} strings"),
                    ));
                }
            }
            Ok(out)
        }
        Node::Repeat(inner, min, max) => {
            let items = expand(recipe, inner)?;
            let mut out = Vec::new();
            let mut current = vec![String::new()];
            for count in 0..=*max {
                if count >= *min {
                    out.extend(current.iter().cloned());
                }
                if count < *max {
                    current = product(recipe, &current, &items)?;
                }
                if current.is_empty() {
                    break;
                }
                if out.len() > MAX_STRINGS {
                    return Err(Error::pattern(
                        recipe,
                        format!("generates more than {MAX_STRINGS} strings"),
                    ));
                }
            }
            Ok(out)
        }
    }
}

/// Generate every string `recipe` describes.
///
/// # Errors
///
/// Returns [`Error::Pattern`] for syntax errors, unknown ingredients, or
/// recipes producing more than [`MAX_STRINGS`] strings.
pub fn generate_all(recipe: &str, ingredients: &Ingredients) -> Result<Vec<String>> {
    let mut parser = Parser {
        recipe,
        ingredients,
        tokens: tokenize(recipe)?,
        pos: 0,
    };
    let root = parser.alternation()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::pattern(recipe, "unexpected trailing input"));
    }
    let strings = expand(recipe, &root)?;
    debug!(recipe, count = strings.len(), "Generated pattern strings");
    Ok(strings)
}
