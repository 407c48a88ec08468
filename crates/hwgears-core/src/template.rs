//! A tiny, restricted expression interpreter for template-string type
//! arguments.
//!
//! The original source evaluates template strings with the host language's
//! `eval` over a namespace of sibling argument bindings. Design Note §9
//! calls for replacing that with "a tiny expression interpreter over a
//! restricted AST (integer arithmetic, `bitw`, `len`, `max`, `min`,
//! subscript, type constructors)" -- this module is exactly that
//! interpreter. It has no host-language dependency: parsing and evaluation
//! are both pure functions over `&str` / [`Env`].
//!
//! Evaluation never panics and never raises: a malformed expression or an
//! unbound name simply returns `None` from [`eval`], so callers can leave
//! the template unresolved and retry after more of the environment is
//! known (spec §4.1: "partial substitution can proceed").

use indexmap::IndexMap;

use crate::types::HwType;

/// A value produced by evaluating a template expression: either a plain
/// integer, or a type (bound via an argument name that refers to another
/// argument's already-inferred dtype).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Type(HwType),
}

impl Value {
    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Type(_) => None,
        }
    }
}

/// Name bindings available while evaluating a template expression: sibling
/// argument values and sibling argument dtypes. Insertion-ordered so a
/// caller iterating `env` (e.g. to report which bindings were available
/// when inference gave up) sees parameters in declaration order rather
/// than hash-bucket order.
pub type Env = IndexMap<String, Value>;

/// `bitw(x) = ceil(log2(x + 1))` for `x > 0`; `bitw(0) = 1` (a single bit
/// can still represent the value zero -- this fills a gap the original
/// left to the host `math.log2` call, see DESIGN.md).
pub fn bitw(x: i64) -> i64 {
    if x <= 0 {
        return 1;
    }
    let mut bits = 0i64;
    let mut limit: i64 = 1;
    while limit < x + 1 {
        limit *= 2;
        bits += 1;
    }
    bits.max(1)
}

/// Evaluates a template expression against `env`. Returns `None` on any
/// parse error, unbound name, or type error -- never panics.
pub fn eval(expr: &str, env: &Env) -> Option<Value> {
    let tokens = lex(expr)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.parse_expr(env)?;
    if parser.pos != parser.tokens.len() {
        return None;
    }
    Some(value)
}

/// Convenience wrapper: evaluates `expr` and requires the result to be an
/// integer.
pub fn eval_int(expr: &str, env: &Env) -> Option<i64> {
    eval(expr, env)?.as_int()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(i64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn lex(s: &str) -> Option<Vec<Token>> {
    let mut out = Vec::new();
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                out.push(Token::Plus);
                i += 1;
            }
            '-' => {
                out.push(Token::Minus);
                i += 1;
            }
            '*' => {
                out.push(Token::Star);
                i += 1;
            }
            '/' => {
                out.push(Token::Slash);
                i += 1;
            }
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            '[' => {
                out.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                out.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                out.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let num: String = chars[start..i].iter().collect();
                out.push(Token::Num(num.parse().ok()?));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                out.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return None,
        }
    }
    Some(out)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    // expr := term (('+' | '-') term)*
    fn parse_expr(&mut self, env: &Env) -> Option<Value> {
        let mut lhs = self.parse_term(env)?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    let rhs = self.parse_term(env)?;
                    lhs = Value::Int(lhs.as_int()? + rhs.as_int()?);
                }
                Some(Token::Minus) => {
                    self.bump();
                    let rhs = self.parse_term(env)?;
                    lhs = Value::Int(lhs.as_int()? - rhs.as_int()?);
                }
                _ => break,
            }
        }
        Some(lhs)
    }

    // term := factor (('*' | '/') factor)*
    fn parse_term(&mut self, env: &Env) -> Option<Value> {
        let mut lhs = self.parse_factor(env)?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    let rhs = self.parse_factor(env)?;
                    lhs = Value::Int(lhs.as_int()? * rhs.as_int()?);
                }
                Some(Token::Slash) => {
                    self.bump();
                    let rhs = self.parse_factor(env)?;
                    let divisor = rhs.as_int()?;
                    if divisor == 0 {
                        return None;
                    }
                    lhs = Value::Int(lhs.as_int()? / divisor);
                }
                _ => break,
            }
        }
        Some(lhs)
    }

    // factor := '-' factor | atom ('[' expr ']')*
    fn parse_factor(&mut self, env: &Env) -> Option<Value> {
        if let Some(Token::Minus) = self.peek() {
            self.bump();
            let v = self.parse_factor(env)?;
            return Some(Value::Int(-v.as_int()?));
        }
        let mut v = self.parse_atom(env)?;
        while let Some(Token::LBracket) = self.peek() {
            self.bump();
            let idx = self.parse_expr(env)?.as_int()?;
            match self.bump() {
                Some(Token::RBracket) => {}
                _ => return None,
            }
            v = match v {
                Value::Type(t) => Value::Type(index_value(&t, idx)?),
                Value::Int(_) => return None,
            };
        }
        Some(v)
    }

    // atom := NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
    fn parse_atom(&mut self, env: &Env) -> Option<Value> {
        match self.bump()? {
            Token::Num(n) => Some(Value::Int(n)),
            Token::LParen => {
                let first = self.parse_expr(env)?;
                if let Some(Token::Comma) = self.peek() {
                    // `(expr, )*n` repetition syntax: builds a positional
                    // tuple type of `n` copies of `expr`'s type.
                    self.bump();
                    match self.bump() {
                        Some(Token::RParen) => {}
                        _ => return None,
                    }
                    match self.bump() {
                        Some(Token::Star) => {}
                        _ => return None,
                    }
                    let count = self.parse_factor(env)?.as_int()?;
                    let elem = match first {
                        Value::Type(t) => t,
                        Value::Int(_) => return None,
                    };
                    if count < 0 {
                        return None;
                    }
                    let fields = std::iter::repeat(elem).take(count as usize).collect();
                    Some(Value::Type(HwType::tuple_positional(fields)))
                } else {
                    match self.bump() {
                        Some(Token::RParen) => Some(first),
                        _ => None,
                    }
                }
            }
            Token::Ident(name) => {
                if let Some(Token::LParen) = self.peek() {
                    self.bump();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.parse_expr(env)?);
                            match self.peek() {
                                Some(Token::Comma) => {
                                    self.bump();
                                }
                                _ => break,
                            }
                        }
                    }
                    match self.bump() {
                        Some(Token::RParen) => {}
                        _ => return None,
                    }
                    call_builtin(&name, args)
                } else {
                    env.get(&name).cloned()
                }
            }
            _ => None,
        }
    }
}

fn call_builtin(name: &str, args: Vec<Value>) -> Option<Value> {
    match name {
        "bitw" => {
            let x = args.first()?.as_int()?;
            Some(Value::Int(bitw(x)))
        }
        "len" => match args.first()? {
            Value::Type(t) => Some(Value::Int(t.len() as i64)),
            Value::Int(_) => None,
        },
        "max" => {
            let a = args.first()?.as_int()?;
            let b = args.get(1)?.as_int()?;
            Some(Value::Int(a.max(b)))
        }
        "min" => {
            let a = args.first()?.as_int()?;
            let b = args.get(1)?.as_int()?;
            Some(Value::Int(a.min(b)))
        }
        _ => None,
    }
}

fn index_value(t: &HwType, idx: i64) -> Option<HwType> {
    crate::type_ops::index(t, idx).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitw_matches_spec_examples() {
        assert_eq!(bitw(1), 1);
        assert_eq!(bitw(2), 2);
        assert_eq!(bitw(3), 2);
        assert_eq!(bitw(4), 3);
        assert_eq!(bitw(0), 1);
    }

    #[test]
    fn eval_plain_arithmetic() {
        let env = Env::new();
        assert_eq!(eval_int("1+2*3", &env), Some(7));
        assert_eq!(eval_int("(1+2)*3", &env), Some(9));
        assert_eq!(eval_int("10-3-2", &env), Some(5));
    }

    #[test]
    fn eval_bitw_of_len_minus_one() {
        let mut env = Env::new();
        env.insert(
            "din".to_string(),
            Value::Type(HwType::tuple_positional(vec![
                HwType::uint(1),
                HwType::uint(1),
                HwType::uint(1),
            ])),
        );
        assert_eq!(eval_int("bitw(len(din)-1)", &env), Some(bitw(2)));
    }

    #[test]
    fn eval_unbound_name_returns_none() {
        let env = Env::new();
        assert_eq!(eval("unbound", &env), None);
    }

    #[test]
    fn eval_never_panics_on_garbage() {
        let env = Env::new();
        assert_eq!(eval("((", &env), None);
        assert_eq!(eval("1 + ", &env), None);
        assert_eq!(eval("1 / 0", &env), None);
    }

    #[test]
    fn eval_tuple_repetition_builds_positional_tuple() {
        let mut env = Env::new();
        env.insert("elem".to_string(), Value::Type(HwType::uint(4)));
        let v = eval("(elem, )*3", &env).unwrap();
        match v {
            Value::Type(t) => assert_eq!(t, HwType::tuple_positional(vec![HwType::uint(4); 3])),
            _ => panic!("expected a type"),
        }
    }

    #[test]
    fn eval_max_min() {
        let env = Env::new();
        assert_eq!(eval_int("max(3,7)", &env), Some(7));
        assert_eq!(eval_int("min(3,7)", &env), Some(3));
    }
}
