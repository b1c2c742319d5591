//! Textual business rule grammar
//!
//! ```text
//! expr    := [threshold "of:"] or
//! or      := and ("|" and)*
//! and     := unary ("&" unary)*
//! unary   := "!" unary | "(" expr ")" | leaf
//! leaf    := host | host "," service
//! threshold := -?N | N%
//! ```
//!
//! With a threshold prefix, the operands of the following chain become the
//! children of the OF node: `2 of: a | b | c` has three children.

use std::sync::LazyLock;

use regex::Regex;

static OF_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+)(%?)\s+of:").expect("of prefix pattern is valid")
});

/// How many children of an OF node must be OK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// Absolute count; negative means "all but N"
    Count(i64),

    Percent(u32),
}

impl Threshold {
    /// Resolve against `n` children
    pub fn required(self, n: usize) -> usize {
        match self {
            Threshold::Count(count) if count >= 0 => count as usize,
            Threshold::Count(count) => n.saturating_sub(count.unsigned_abs() as usize),
            Threshold::Percent(percent) => (n * percent as usize).div_ceil(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleExpr {
    Host(String),
    Service(String, String),
    And(Vec<RuleExpr>),
    Or(Vec<RuleExpr>),
    Of(Threshold, Vec<RuleExpr>),
    Not(Box<RuleExpr>),
}

impl RuleExpr {
    /// Every referenced item, as (host, optional service)
    pub fn leaves(&self) -> Vec<(&str, Option<&str>)> {
        let mut leaves = Vec::new();
        let mut pending = vec![self];

        while let Some(expr) = pending.pop() {
            match expr {
                RuleExpr::Host(host) => leaves.push((host.as_str(), None)),
                RuleExpr::Service(host, service) => {
                    leaves.push((host.as_str(), Some(service.as_str())))
                }
                RuleExpr::And(children) | RuleExpr::Or(children) | RuleExpr::Of(_, children) => {
                    pending.extend(children.iter().rev())
                }
                RuleExpr::Not(child) => pending.push(child),
            }
        }

        leaves
    }
}

pub fn parse(input: &str) -> Result<RuleExpr, String> {
    let mut parser = Parser { input, pos: 0 };
    let expr = parser.expr()?;

    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(format!("unexpected input at {}: {}", parser.pos, parser.rest()));
    }

    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<RuleExpr, String> {
        let Some(threshold) = self.threshold()? else {
            return self.or();
        };

        let children = match self.or()? {
            RuleExpr::Or(children) | RuleExpr::And(children) => children,
            single => vec![single],
        };
        Ok(RuleExpr::Of(threshold, children))
    }

    fn threshold(&mut self) -> Result<Option<Threshold>, String> {
        let Some(captures) = OF_PREFIX.captures(self.rest()) else {
            return Ok(None);
        };

        let number = &captures[1];
        let threshold = if &captures[2] == "%" {
            let percent: u32 = number
                .parse()
                .map_err(|_| format!("invalid percentage: {number}"))?;
            if percent > 100 {
                return Err(format!("invalid percentage: {number}"));
            }
            Threshold::Percent(percent)
        } else {
            Threshold::Count(number.parse().map_err(|_| format!("invalid count: {number}"))?)
        };

        self.pos += captures[0].len();
        Ok(Some(threshold))
    }

    fn or(&mut self) -> Result<RuleExpr, String> {
        let mut operands = vec![self.and()?];
        while self.eat('|') {
            operands.push(self.and()?);
        }

        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            RuleExpr::Or(operands)
        })
    }

    fn and(&mut self) -> Result<RuleExpr, String> {
        let mut operands = vec![self.unary()?];
        while self.eat('&') {
            operands.push(self.unary()?);
        }

        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            RuleExpr::And(operands)
        })
    }

    fn unary(&mut self) -> Result<RuleExpr, String> {
        if self.eat('!') {
            return Ok(RuleExpr::Not(Box::new(self.unary()?)));
        }

        if self.eat('(') {
            let inner = self.expr()?;
            if !self.eat(')') {
                return Err(format!("missing ')' at {}", self.pos));
            }
            return Ok(inner);
        }

        self.leaf()
    }

    fn leaf(&mut self) -> Result<RuleExpr, String> {
        self.skip_whitespace();
        let rest = self.rest();
        let end = rest.find(['&', '|', '(', ')', '!']).unwrap_or(rest.len());
        let text = rest[..end].trim();
        self.pos += end;

        if text.is_empty() {
            return Err(format!("expected an item name at {}", self.pos));
        }

        match text.split_once(',') {
            Some((host, service)) => {
                let (host, service) = (host.trim(), service.trim());
                if host.is_empty() || service.is_empty() {
                    return Err(format!("invalid service reference: {text}"));
                }
                Ok(RuleExpr::Service(host.to_string(), service.to_string()))
            }
            None => Ok(RuleExpr::Host(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn host(name: &str) -> RuleExpr {
        RuleExpr::Host(name.to_string())
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a & b | c").unwrap();
        assert_eq!(
            expr,
            RuleExpr::Or(vec![RuleExpr::And(vec![host("a"), host("b")]), host("c")])
        );
    }

    #[test]
    fn test_parentheses_and_services() {
        let expr = parse("web1,http & (db1 | db2,mysql)").unwrap();
        assert_eq!(
            expr,
            RuleExpr::And(vec![
                RuleExpr::Service("web1".into(), "http".into()),
                RuleExpr::Or(vec![
                    host("db1"),
                    RuleExpr::Service("db2".into(), "mysql".into())
                ]),
            ])
        );
    }

    #[test]
    fn test_not() {
        let expr = parse("!a & b").unwrap();
        assert_eq!(
            expr,
            RuleExpr::And(vec![RuleExpr::Not(Box::new(host("a"))), host("b")])
        );
    }

    #[test]
    fn test_of_prefix() {
        let expr = parse("2 of: a | b | c").unwrap();
        assert_eq!(
            expr,
            RuleExpr::Of(Threshold::Count(2), vec![host("a"), host("b"), host("c")])
        );

        let expr = parse("50% of: a & b").unwrap();
        assert_eq!(expr, RuleExpr::Of(Threshold::Percent(50), vec![host("a"), host("b")]));

        let expr = parse("x & (-1 of: a | b)").unwrap();
        assert_eq!(
            expr,
            RuleExpr::And(vec![
                host("x"),
                RuleExpr::Of(Threshold::Count(-1), vec![host("a"), host("b")])
            ])
        );
    }

    #[test]
    fn test_threshold_resolution() {
        assert_eq!(Threshold::Count(2).required(5), 2);
        assert_eq!(Threshold::Count(-1).required(5), 4);
        assert_eq!(Threshold::Count(-9).required(5), 0);
        assert_eq!(Threshold::Percent(50).required(3), 2);
        assert_eq!(Threshold::Percent(100).required(3), 3);
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("a &").is_err());
        assert!(parse("(a | b").is_err());
        assert!(parse("a | b)").is_err());
        assert!(parse("web1,").is_err());
        assert!(parse("150% of: a | b").is_err());
    }

    #[test]
    fn test_leaves_in_order() {
        let expr = parse("a & (b,svc | !c)").unwrap();
        assert_eq!(expr.leaves(), vec![("a", None), ("b", Some("svc")), ("c", None)]);
    }
}
