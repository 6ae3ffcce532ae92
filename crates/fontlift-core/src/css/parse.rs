//! Declaration scanner over `cssparser`'s tokenizer.
//!
//! We do not build a full stylesheet tree: the rewriter only needs every `property: value`
//! declaration with the byte offsets of its value tokens, and whether it sits inside an
//! `@font-face` block. Offsets are absolute byte offsets into the scanned text.

use crate::model::GenericFamily;
use cssparser::{ParseError, Parser, ParserInput, Token};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueItem {
    Ident { name: String, span: Span },
    String { value: String, span: Span },
    Comma { span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationValue {
    /// Identifiers, quoted strings and commas only.
    List(Vec<ValueItem>),
    /// Anything we cannot reason about token by token (functions, numbers, `var()`, ...).
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: DeclarationValue,
    pub in_font_face: bool,
}

impl Declaration {
    pub fn is_font_family(&self) -> bool {
        self.property.eq_ignore_ascii_case("font-family")
    }

    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.value, DeclarationValue::Raw(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockContext {
    font_face: bool,
    declarations: bool,
}

const STYLESHEET: BlockContext = BlockContext {
    font_face: false,
    declarations: false,
};

const RULE_BODY: BlockContext = BlockContext {
    font_face: false,
    declarations: true,
};

/// Returns every declaration of the stylesheet in source order.
pub fn parse_declarations(css: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut out = Vec::new();
    walk_block(&mut parser, css, STYLESHEET, &mut out);
    out
}

fn next_token<'i>(parser: &mut Parser<'i, '_>) -> Option<Token<'i>> {
    parser.next_including_whitespace_and_comments().ok().cloned()
}

fn offset(parser: &Parser<'_, '_>) -> usize {
    parser.position().byte_index()
}

fn walk_nested<'i>(
    parser: &mut Parser<'i, '_>,
    css: &str,
    ctx: BlockContext,
    out: &mut Vec<Declaration>,
) {
    let result: Result<(), ParseError<'i, ()>> = parser.parse_nested_block(|nested| {
        walk_block(nested, css, ctx, out);
        Ok(())
    });
    let _ = result;
}

fn walk_block(
    parser: &mut Parser<'_, '_>,
    css: &str,
    ctx: BlockContext,
    out: &mut Vec<Declaration>,
) {
    while let Some(token) = next_token(parser) {
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) | Token::Semicolon => {}
            Token::CDO | Token::CDC | Token::CloseCurlyBracket => {}
            Token::CurlyBracketBlock => walk_nested(parser, css, RULE_BODY, out),
            Token::AtKeyword(name) => {
                let body = BlockContext {
                    font_face: name.eq_ignore_ascii_case("font-face"),
                    declarations: true,
                };
                consume_rule(parser, css, body, out);
            }
            Token::Ident(name) if ctx.declarations && eat_colon(parser) => {
                parse_declaration(parser, css, name.to_string(), ctx, out);
            }
            _ => consume_rule(parser, css, RULE_BODY, out),
        }
    }
}

/// Skips a rule prelude, descending into its block if it has one.
fn consume_rule(
    parser: &mut Parser<'_, '_>,
    css: &str,
    body: BlockContext,
    out: &mut Vec<Declaration>,
) {
    while let Some(token) = next_token(parser) {
        match token {
            Token::Semicolon => return,
            Token::CurlyBracketBlock => {
                walk_nested(parser, css, body, out);
                return;
            }
            _ => {}
        }
    }
}

fn eat_colon(parser: &mut Parser<'_, '_>) -> bool {
    let state = parser.state();
    while let Some(token) = next_token(parser) {
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => continue,
            Token::Colon => return true,
            _ => break,
        }
    }
    parser.reset(&state);
    false
}

fn parse_declaration(
    parser: &mut Parser<'_, '_>,
    css: &str,
    property: String,
    ctx: BlockContext,
    out: &mut Vec<Declaration>,
) {
    let value_start = offset(parser);
    let mut items = Vec::new();
    let mut raw = false;
    let mut important = false;

    let value_end = loop {
        let start = offset(parser);
        let Some(token) = next_token(parser) else {
            break offset(parser);
        };
        let span = Span {
            start,
            end: offset(parser),
        };
        match token {
            Token::Semicolon => break start,
            Token::WhiteSpace(_) | Token::Comment(_) => {}
            // `a:hover { ... }` inside a nested block: this was a rule, not a declaration.
            Token::CurlyBracketBlock => {
                walk_nested(parser, css, RULE_BODY, out);
                return;
            }
            _ if important => {}
            Token::Delim('!') => important = true,
            Token::Ident(name) => items.push(ValueItem::Ident {
                name: name.to_string(),
                span,
            }),
            Token::QuotedString(value) => items.push(ValueItem::String {
                value: value.to_string(),
                span,
            }),
            Token::Comma => items.push(ValueItem::Comma { span }),
            _ => raw = true,
        }
    };

    let value = if raw {
        DeclarationValue::Raw(css[value_start..value_end].trim().to_string())
    } else {
        DeclarationValue::List(items)
    };
    out.push(Declaration {
        property,
        value,
        in_font_face: ctx.font_face,
    });
}

fn is_css_wide_keyword(ident: &str) -> bool {
    ["inherit", "initial", "unset", "revert", "revert-layer"]
        .iter()
        .any(|k| k.eq_ignore_ascii_case(ident))
}

/// Ordered family names of a declaration value.
///
/// Quoted strings are one family each, runs of identifiers are joined with a space, and generic
/// or CSS-wide keywords are dropped.
pub fn extract_font_families(declaration: &Declaration) -> Vec<String> {
    let items = match &declaration.value {
        DeclarationValue::Raw(raw) => return vec![raw.clone()],
        DeclarationValue::List(items) => items,
    };

    let mut families = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    for item in items {
        match item {
            ValueItem::Ident { name, .. } => {
                if GenericFamily::from_keyword(name).is_none() && !is_css_wide_keyword(name) {
                    buffer.push(name);
                }
            }
            ValueItem::Comma { .. } => {
                if !buffer.is_empty() {
                    families.push(buffer.join(" "));
                    buffer.clear();
                }
            }
            ValueItem::String { value, .. } => {
                families.push(value.clone());
                buffer.clear();
            }
        }
    }
    if !buffer.is_empty() {
        families.push(buffer.join(" "));
    }
    families
}

pub fn extract_generic(declaration: &Declaration) -> Option<GenericFamily> {
    let DeclarationValue::List(items) = &declaration.value else {
        return None;
    };
    items.iter().find_map(|item| match item {
        ValueItem::Ident { name, .. } => GenericFamily::from_keyword(name),
        _ => None,
    })
}

/// Offset right after the first family of the value, where extra fallbacks get spliced in.
pub fn extract_end_of_first_child(declaration: &Declaration) -> Option<usize> {
    let DeclarationValue::List(items) = &declaration.value else {
        return None;
    };
    for item in items {
        match item {
            ValueItem::String { span, .. } => return Some(span.end),
            ValueItem::Comma { span } => return Some(span.start),
            ValueItem::Ident { .. } => {}
        }
    }
    items.last().map(|item| match item {
        ValueItem::Ident { span, .. }
        | ValueItem::String { span, .. }
        | ValueItem::Comma { span } => span.end,
    })
}

/// Families the author already declares through `@font-face`.
pub fn existing_font_face_families(declarations: &[Declaration]) -> FxHashSet<String> {
    declarations
        .iter()
        .filter(|d| d.in_font_face && d.is_font_family())
        .flat_map(extract_font_families)
        .collect()
}
