use crate::{Error, Result};
use futures::future::BoxFuture;

/// Minifies synthesized declarations in production builds.
pub trait CssMinifier: Send + Sync {
    fn minify<'a>(&'a self, css: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Strips comments and insignificant whitespace. Strings are copied verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceMinifier;

impl CssMinifier for WhitespaceMinifier {
    fn minify<'a>(&'a self, css: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(futures::future::ready(minify_css(css)))
    }
}

fn no_space_after(ch: char) -> bool {
    matches!(ch, '{' | '}' | ';' | ':' | ',' | '>' | '(')
}

fn no_space_before(ch: char) -> bool {
    matches!(ch, '{' | '}' | ';' | ',' | '>' | ')')
}

fn flush_space(out: &mut String, pending: &mut bool, next: char) {
    if std::mem::take(pending) {
        let keep = out
            .chars()
            .next_back()
            .is_some_and(|prev| !no_space_after(prev) && !no_space_before(next));
        if keep {
            out.push(' ');
        }
    }
}

pub fn minify_css(css: &str) -> Result<String> {
    let mut out = String::with_capacity(css.len());
    let mut pending_space = false;
    let mut chars = css.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' | '\'' => {
                flush_space(&mut out, &mut pending_space, ch);
                out.push(ch);
                let mut closed = false;
                while let Some(c) = chars.next() {
                    out.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if c == ch {
                        closed = true;
                        break;
                    } else if c == '\n' {
                        break;
                    }
                }
                if !closed {
                    return Err(Error::Minify {
                        message: "unterminated string".to_string(),
                    });
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return Err(Error::Minify {
                        message: "unterminated comment".to_string(),
                    });
                }
                pending_space = !out.is_empty();
            }
            c if c.is_whitespace() => pending_space = !out.is_empty(),
            '}' => {
                pending_space = false;
                if out.ends_with(';') {
                    out.pop();
                }
                out.push('}');
            }
            c => {
                flush_space(&mut out, &mut pending_space, c);
                out.push(c);
            }
        }
    }
    Ok(out)
}
