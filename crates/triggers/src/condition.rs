//! Trigger condition expressions.
//!
//! Conditions are small boolean expressions over an event payload:
//!
//! ```text
//! hotCount >= 2
//! changeType == "pricing"
//! riskScore > 70 AND region != "eu"
//! payload.lead.title CONTAINS "plumber" OR NOT (source == "reddit")
//! always
//! ```
//!
//! Grammar (informal):
//! ```text
//! expr     = and ("OR" and)*
//! and      = unary ("AND" unary)*
//! unary    = "NOT" unary | primary
//! primary  = "(" expr ")" | "always" | atom
//! atom     = path [NOT] OP value
//! path     = ["payload."] IDENT ("." IDENT)*
//! OP       = "CONTAINS" | "MATCHES" | "STARTS_WITH" | "ENDS_WITH"
//!          | "==" | "!=" | ">" | "<" | ">=" | "<="
//! value    = QUOTED_STRING | NUMBER | "true" | "false" | IDENT
//! ```
//!
//! Evaluation never fails: a missing field or a type mismatch makes the
//! atom false.

use regex_lite::Regex;
use serde_json::Value as Json;

use agentrelay_core::Payload;

/// A parsed condition tree.
#[derive(Debug, Clone)]
pub enum Condition {
    Atom(Atom),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    /// Empty condition or the `always` keyword
    Always,
}

#[derive(Debug, Clone)]
pub struct Atom {
    /// Dotted lookup path into the payload, already split
    pub path: Vec<String>,
    pub op: Op,
    pub value: Literal,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Contains,
    NotContains,
    Matches,
    NotMatches,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// A literal on the right-hand side of an atom.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Condition {
    /// Evaluate against an event payload.
    pub fn evaluate(&self, payload: &Payload) -> bool {
        match self {
            Condition::Always => true,
            Condition::Atom(atom) => atom.evaluate(payload),
            Condition::And(a, b) => a.evaluate(payload) && b.evaluate(payload),
            Condition::Or(a, b) => a.evaluate(payload) || b.evaluate(payload),
            Condition::Not(inner) => !inner.evaluate(payload),
        }
    }
}

impl Atom {
    fn evaluate(&self, payload: &Payload) -> bool {
        let Some(field) = self.resolve(payload) else {
            return false;
        };
        match self.op {
            Op::Eq => equals(field, &self.value),
            Op::NotEq => !equals(field, &self.value) && comparable(field, &self.value),
            Op::Gt => compare(field, &self.value, |a, b| a > b),
            Op::Lt => compare(field, &self.value, |a, b| a < b),
            Op::Gte => compare(field, &self.value, |a, b| a >= b),
            Op::Lte => compare(field, &self.value, |a, b| a <= b),
            Op::Contains => text_op(field, &self.value, |f, v| f.contains(v)),
            Op::NotContains => text_op(field, &self.value, |f, v| !f.contains(v)),
            Op::StartsWith => text_op(field, &self.value, |f, v| f.starts_with(v)),
            Op::NotStartsWith => text_op(field, &self.value, |f, v| !f.starts_with(v)),
            Op::EndsWith => text_op(field, &self.value, |f, v| f.ends_with(v)),
            Op::NotEndsWith => text_op(field, &self.value, |f, v| !f.ends_with(v)),
            Op::Matches => text_op(field, &self.value, |f, v| {
                Regex::new(v).is_ok_and(|re| re.is_match(f))
            }),
            Op::NotMatches => text_op(field, &self.value, |f, v| {
                Regex::new(v).is_ok_and(|re| !re.is_match(f))
            }),
        }
    }

    fn resolve<'a>(&self, payload: &'a Payload) -> Option<&'a Json> {
        let (first, rest) = self.path.split_first()?;
        let mut current = payload.get(first)?;
        for part in rest {
            current = match current {
                Json::Object(map) => map.get(part)?,
                Json::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn equals(field: &Json, literal: &Literal) -> bool {
    match (field, literal) {
        (Json::String(s), Literal::Str(v)) => s == v,
        (Json::Number(n), Literal::Num(v)) => n.as_f64().is_some_and(|x| x == *v),
        (Json::Bool(b), Literal::Bool(v)) => b == v,
        _ => false,
    }
}

/// `!=` only holds between values of the same kind; a missing or
/// differently-typed field is not "unequal", it is no match.
fn comparable(field: &Json, literal: &Literal) -> bool {
    matches!(
        (field, literal),
        (Json::String(_), Literal::Str(_))
            | (Json::Number(_), Literal::Num(_))
            | (Json::Bool(_), Literal::Bool(_))
    )
}

fn compare(field: &Json, literal: &Literal, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (field.as_f64(), literal) {
        (Some(x), Literal::Num(n)) => cmp(x, *n),
        _ => false,
    }
}

fn text_op(field: &Json, literal: &Literal, op: impl Fn(&str, &str) -> bool) -> bool {
    let (Json::String(f), Literal::Str(v)) = (field, literal) else {
        return false;
    };
    op(f, v)
}

// ─── Parser ──────────────────────────────────────────────────────────

/// Parse a condition expression string into a [`Condition`] tree.
///
/// Empty input and the bare keyword `always` both yield [`Condition::Always`].
pub fn parse_condition(input: &str) -> Result<Condition, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Condition::Always);
    }
    let tokens = tokenize(input)?;
    let (cond, rest) = parse_or(&tokens)?;
    if !rest.is_empty() {
        return Err(format!("unexpected tokens after expression: {rest:?}"));
    }
    Ok(cond)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    And,
    Or,
    Not,
    Contains,
    Matches,
    StartsWith,
    EndsWith,
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => {
                            if let Some(escaped) = chars.next() {
                                s.push(escaped);
                            }
                        }
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => return Err("unterminated string literal".into()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '>' | '<' => {
                chars.next();
                let inclusive = chars.next_if_eq(&'=').is_some();
                tokens.push(match (c, inclusive) {
                    ('>', false) => Token::Gt,
                    ('>', true) => Token::Gte,
                    ('<', false) => Token::Lt,
                    _ => Token::Lte,
                });
            }
            '=' => {
                chars.next();
                chars.next_if_eq(&'=');
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' | '|' => {
                chars.next();
                if chars.next_if_eq(&c).is_none() {
                    return Err(format!("expected '{c}{c}'"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            _ if c.is_ascii_digit() || c == '-' => {
                let mut num = String::new();
                num.push(c);
                chars.next();
                while let Some(nc) = chars.next_if(|nc| nc.is_ascii_digit() || *nc == '.') {
                    num.push(nc);
                }
                let n = num
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number: {num}"))?;
                tokens.push(Token::Num(n));
            }
            _ if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut word = String::new();
                while let Some(wc) =
                    chars.next_if(|wc| wc.is_alphanumeric() || matches!(*wc, '_' | '.' | '-'))
                {
                    word.push(wc);
                }
                tokens.push(match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "CONTAINS" => Token::Contains,
                    "MATCHES" => Token::Matches,
                    "STARTS_WITH" => Token::StartsWith,
                    "ENDS_WITH" => Token::EndsWith,
                    _ => Token::Ident(word),
                });
            }
            _ => return Err(format!("unexpected character: {c}")),
        }
    }

    Ok(tokens)
}

fn parse_or(tokens: &[Token]) -> Result<(Condition, &[Token]), String> {
    let (mut left, mut rest) = parse_and(tokens)?;
    while rest.first() == Some(&Token::Or) {
        let (right, remaining) = parse_and(&rest[1..])?;
        left = Condition::Or(Box::new(left), Box::new(right));
        rest = remaining;
    }
    Ok((left, rest))
}

fn parse_and(tokens: &[Token]) -> Result<(Condition, &[Token]), String> {
    let (mut left, mut rest) = parse_unary(tokens)?;
    while rest.first() == Some(&Token::And) {
        let (right, remaining) = parse_unary(&rest[1..])?;
        left = Condition::And(Box::new(left), Box::new(right));
        rest = remaining;
    }
    Ok((left, rest))
}

fn parse_unary(tokens: &[Token]) -> Result<(Condition, &[Token]), String> {
    if tokens.first() == Some(&Token::Not) {
        let (inner, rest) = parse_unary(&tokens[1..])?;
        return Ok((Condition::Not(Box::new(inner)), rest));
    }
    parse_primary(tokens)
}

fn parse_primary(tokens: &[Token]) -> Result<(Condition, &[Token]), String> {
    match tokens.first() {
        Some(Token::LParen) => {
            let (inner, rest) = parse_or(&tokens[1..])?;
            if rest.first() != Some(&Token::RParen) {
                return Err("expected closing parenthesis".into());
            }
            Ok((inner, &rest[1..]))
        }
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("always") => {
            Ok((Condition::Always, &tokens[1..]))
        }
        _ => parse_atom(tokens),
    }
}

fn parse_atom(tokens: &[Token]) -> Result<(Condition, &[Token]), String> {
    let (path, rest) = parse_path(tokens)?;
    let (op, rest) = parse_op(rest)?;
    let (value, rest) = parse_literal(rest)?;
    Ok((Condition::Atom(Atom { path, op, value }), rest))
}

fn parse_path(tokens: &[Token]) -> Result<(Vec<String>, &[Token]), String> {
    match tokens.first() {
        Some(Token::Ident(name)) => {
            let name = name.strip_prefix("payload.").unwrap_or(name);
            let path: Vec<String> = name.split('.').map(str::to_string).collect();
            if path.iter().any(|p| p.is_empty()) {
                return Err(format!("invalid field path: {name}"));
            }
            Ok((path, &tokens[1..]))
        }
        other => Err(format!("expected field name, got {other:?}")),
    }
}

fn parse_op(tokens: &[Token]) -> Result<(Op, &[Token]), String> {
    if tokens.first() == Some(&Token::Not) {
        let (base, rest) = parse_base_op(&tokens[1..])?;
        let negated = match base {
            Op::Contains => Op::NotContains,
            Op::Matches => Op::NotMatches,
            Op::StartsWith => Op::NotStartsWith,
            Op::EndsWith => Op::NotEndsWith,
            other => return Err(format!("cannot negate operator: {other:?}")),
        };
        return Ok((negated, rest));
    }
    parse_base_op(tokens)
}

fn parse_base_op(tokens: &[Token]) -> Result<(Op, &[Token]), String> {
    let op = match tokens.first() {
        Some(Token::Contains) => Op::Contains,
        Some(Token::Matches) => Op::Matches,
        Some(Token::StartsWith) => Op::StartsWith,
        Some(Token::EndsWith) => Op::EndsWith,
        Some(Token::Eq) => Op::Eq,
        Some(Token::NotEq) => Op::NotEq,
        Some(Token::Gt) => Op::Gt,
        Some(Token::Lt) => Op::Lt,
        Some(Token::Gte) => Op::Gte,
        Some(Token::Lte) => Op::Lte,
        other => return Err(format!("expected operator, got {other:?}")),
    };
    Ok((op, &tokens[1..]))
}

fn parse_literal(tokens: &[Token]) -> Result<(Literal, &[Token]), String> {
    let literal = match tokens.first() {
        Some(Token::Str(s)) => Literal::Str(s.clone()),
        Some(Token::Num(n)) => Literal::Num(*n),
        Some(Token::Ident(word)) => match word.as_str() {
            "true" => Literal::Bool(true),
            "false" => Literal::Bool(false),
            _ => Literal::Str(word.clone()),
        },
        other => return Err(format!("expected value, got {other:?}")),
    };
    Ok((literal, &tokens[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Json) -> Payload {
        match value {
            Json::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn holds(expr: &str, value: Json) -> bool {
        parse_condition(expr).unwrap().evaluate(&payload(value))
    }

    #[test]
    fn empty_and_always_are_unconditional() {
        assert!(holds("", json!({})));
        assert!(holds("always", json!({})));
        assert!(holds("  ALWAYS ", json!({ "x": 1 })));
    }

    #[test]
    fn numeric_thresholds() {
        assert!(holds("hotCount >= 2", json!({ "hotCount": 3 })));
        assert!(holds("hotCount >= 2", json!({ "hotCount": 2 })));
        assert!(!holds("hotCount >= 2", json!({ "hotCount": 0 })));
        assert!(holds("riskScore > 70", json!({ "riskScore": 70.5 })));
        assert!(!holds("riskScore > 70", json!({ "riskScore": 70 })));
        assert!(holds("delta < -1.5", json!({ "delta": -2 })));
    }

    #[test]
    fn missing_field_never_matches() {
        assert!(!holds("hotCount >= 2", json!({})));
        assert!(!holds(r#"changeType == "pricing""#, json!({})));
        assert!(!holds(r#"changeType != "pricing""#, json!({})));
    }

    #[test]
    fn type_mismatch_never_matches() {
        assert!(!holds("hotCount >= 2", json!({ "hotCount": "three" })));
        assert!(!holds("hotCount >= 2", json!({ "hotCount": null })));
        assert!(!holds(r#"title CONTAINS "x""#, json!({ "title": 42 })));
        assert!(!holds("flag == 1", json!({ "flag": true })));
    }

    #[test]
    fn string_equality_and_inequality() {
        assert!(holds(r#"changeType == "pricing""#, json!({ "changeType": "pricing" })));
        assert!(!holds(r#"changeType == "pricing""#, json!({ "changeType": "features" })));
        assert!(holds("region != eu", json!({ "region": "us" })));
        assert!(holds("changed == true", json!({ "changed": true })));
    }

    #[test]
    fn boolean_connectives_and_grouping() {
        let expr = r#"riskScore > 70 AND region != "eu""#;
        assert!(holds(expr, json!({ "riskScore": 90, "region": "us" })));
        assert!(!holds(expr, json!({ "riskScore": 90, "region": "eu" })));

        let expr = "NOT (hotCount >= 2 OR warmCount >= 5)";
        assert!(holds(expr, json!({ "hotCount": 1, "warmCount": 1 })));
        assert!(!holds(expr, json!({ "hotCount": 1, "warmCount": 9 })));

        assert!(holds("a == 1 && b == 2", json!({ "a": 1, "b": 2 })));
        assert!(holds("a == 1 || b == 2", json!({ "a": 0, "b": 2 })));
    }

    #[test]
    fn text_operators() {
        let p = json!({ "title": "Plumber losing sales to missed calls" });
        assert!(holds(r#"title CONTAINS "missed""#, p.clone()));
        assert!(holds(r#"title NOT CONTAINS "hiring""#, p.clone()));
        assert!(holds(r#"title STARTS_WITH "Plumber""#, p.clone()));
        assert!(holds(r#"title ENDS_WITH "calls""#, p.clone()));
        assert!(holds(r#"title MATCHES "(?i)^plumber""#, p.clone()));
        assert!(!holds(r#"title NOT MATCHES "sales""#, p));
    }

    #[test]
    fn dotted_paths_and_payload_prefix() {
        let p = json!({ "lead": { "score": 88, "tags": ["hot", "smb"] } });
        assert!(holds("lead.score >= 80", p.clone()));
        assert!(holds("payload.lead.score >= 80", p.clone()));
        assert!(holds("lead.tags.0 == hot", p.clone()));
        assert!(!holds("lead.tags.7 == hot", p.clone()));
        assert!(!holds("lead.score.deeper == 1", p));
    }

    #[test]
    fn parse_errors() {
        assert!(parse_condition("hotCount >=").is_err());
        assert!(parse_condition("hotCount 2").is_err());
        assert!(parse_condition(r#"title == "open"#).is_err());
        assert!(parse_condition("(a == 1").is_err());
        assert!(parse_condition("a == 1 b == 2").is_err());
        assert!(parse_condition("a NOT > 1").is_err());
        assert!(parse_condition("a & b").is_err());
    }
}
