use super::error::{CompileError, ErrorKind};
use super::filter::*;
use super::geometry::{Coordinate, Envelope, Geometry, GeometryType, Ring};
use super::tokens::{Kw, Op, Punct, TKind, Token, TokenKind, END};
use super::validation;
use crate::config::Dialect;

use std::iter::Peekable;

/// Outcome of a grammar production: parenthesized groups and primaries may
/// turn out to be either kind, the enclosing production decides which one
/// it accepts.
#[derive(Debug)]
enum Parsed {
    Filter(Filter),
    Expression(Expression),
}

fn syntax_error(message: String, token: &Token) -> CompileError {
    CompileError::report(ErrorKind::Syntax, message, token.position())
}

fn semantic_error(message: String, token: &Token) -> CompileError {
    CompileError::report(ErrorKind::Semantic, message, token.position())
}

fn unexp_token(found: &Token, expected: &str) -> CompileError {
    syntax_error(format!("unexpected {}, expected {}", found.get_kind(), expected), found)
}

fn unclosed(open: &Token) -> CompileError {
    syntax_error("unclosed parenthesis, expected `)` before end of input".to_string(), open)
}

fn require_filter(parsed: Parsed, start: &Token) -> Result<Filter, CompileError> {
    match parsed {
        Parsed::Filter(filter) => Ok(filter),
        Parsed::Expression(_) => Err(syntax_error(
            "expected a predicate but found a plain expression".to_string(),
            start,
        )),
    }
}

fn require_expression(parsed: Parsed, start: &Token) -> Result<Expression, CompileError> {
    match parsed {
        Parsed::Expression(expression) => Ok(expression),
        Parsed::Filter(_) => Err(syntax_error(
            "expected an expression but found a predicate".to_string(),
            start,
        )),
    }
}

fn comparison_op(op: Op) -> Option<ComparisonOp> {
    let op = match op {
        Op::Equal => ComparisonOp::Equal,
        Op::NotEqual => ComparisonOp::NotEqual,
        Op::Lesser => ComparisonOp::Lesser,
        Op::LesserOrEqual => ComparisonOp::LesserOrEqual,
        Op::Greater => ComparisonOp::Greater,
        Op::GreaterOrEqual => ComparisonOp::GreaterOrEqual,
        _ => return None,
    };

    Some(op)
}

fn additive_op(kind: &TokenKind) -> Option<ArithmeticOp> {
    match kind {
        TKind::Operator(Op::Plus) => Some(ArithmeticOp::Add),
        TKind::Operator(Op::Minus) => Some(ArithmeticOp::Subtract),
        _ => None,
    }
}

fn multiplicative_op(kind: &TokenKind) -> Option<ArithmeticOp> {
    match kind {
        TKind::Operator(Op::Star) => Some(ArithmeticOp::Multiply),
        TKind::Operator(Op::Slash) => Some(ArithmeticOp::Divide),
        _ => None,
    }
}

fn is_predicate_token(kind: &TokenKind) -> bool {
    match kind {
        TKind::Operator(op) => comparison_op(*op).is_some(),
        TKind::Keyword(Kw::Like)
        | TKind::Keyword(Kw::ILike)
        | TKind::Keyword(Kw::Between)
        | TKind::Keyword(Kw::In)
        | TKind::Keyword(Kw::Is) => true,
        _ => false,
    }
}

/// Parses a number token, `negative` applying a folded unary minus.
fn number_literal(text: &str, negative: bool, token: &Token) -> Result<Literal, CompileError> {
    if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        let num = text.parse::<f64>().map_err(|e| {
            semantic_error(format!("invalid number `{}`", text), token).with_cause(e)
        })?;
        return Ok(Literal::Float(if negative { -num } else { num }));
    }

    // Sign and digits are parsed together so the most negative integer fits
    let signed = if negative { format!("-{}", text) } else { text.to_string() };
    signed.parse::<i64>().map(Literal::Integer).map_err(|e| {
        semantic_error(format!("integer literal `{}` is out of range", signed), token).with_cause(e)
    })
}

/// Builds a filter from a token stream.
///
/// The whole stream has to be consumed: tokens left after a complete filter
/// are reported as trailing input. A stream lacking the end token is
/// treated as if it had one.
pub fn build_filter<'a>(tokens: impl Iterator<Item = &'a Token>, dialect: &Dialect) -> Result<Filter, CompileError> {
    let mut parser = Parser::new(tokens, dialect);

    let start = parser.peek();
    let parsed = parser.parse_or()?;
    parser.finish()?;

    require_filter(parsed, start)
}

/// Builds a value expression from a token stream.
pub fn build_expression<'a>(tokens: impl Iterator<Item = &'a Token>, dialect: &Dialect) -> Result<Expression, CompileError> {
    let mut parser = Parser::new(tokens, dialect);

    let start = parser.peek();
    let parsed = parser.parse_or()?;
    parser.finish()?;

    require_expression(parsed, start)
}

struct Parser<'a, 'd, I: Iterator<Item = &'a Token>> {
    tokens: Peekable<I>,
    dialect: &'d Dialect,
    depth: usize,
}

impl<'a, 'd, I: Iterator<Item = &'a Token>> Parser<'a, 'd, I> {
    fn new(tokens: I, dialect: &'d Dialect) -> Self {
        Parser {
            tokens: tokens.peekable(),
            dialect,
            depth: 0,
        }
    }

    fn peek(&mut self) -> &'a Token {
        self.tokens.peek().copied().unwrap_or(&END)
    }

    fn next(&mut self) -> &'a Token {
        self.tokens.next().unwrap_or(&END)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().get_kind() == kind {
            self.next();
            return true;
        }

        false
    }

    fn eat_kw(&mut self, kw: Kw) -> bool {
        self.eat(&TKind::Keyword(kw))
    }

    fn expect_kw(&mut self, kw: Kw) -> Result<&'a Token, CompileError> {
        let token = self.next();
        if token.get_kind() != &TKind::Keyword(kw) {
            return Err(unexp_token(token, &format!("keyword `{}`", kw.name())));
        }

        Ok(token)
    }

    fn expect_punct(&mut self, punct: Punct) -> Result<&'a Token, CompileError> {
        let token = self.next();
        if token.get_kind() != &TKind::Punct(punct) {
            return Err(unexp_token(token, &format!("`{}`", punct.symbol())));
        }

        Ok(token)
    }

    fn close(&mut self, open: &Token) -> Result<(), CompileError> {
        let token = self.next();
        match token.get_kind() {
            TKind::Punct(Punct::RParen) => Ok(()),
            TKind::End => Err(unclosed(open)),
            _ => Err(unexp_token(token, "`)`")),
        }
    }

    fn finish(&mut self) -> Result<(), CompileError> {
        let token = self.next();
        if !token.is_end() {
            return Err(syntax_error(
                format!("unexpected trailing input: {}", token.get_kind()),
                token,
            ));
        }

        Ok(())
    }

    // Every recursive production passes through `descend`, which bounds
    // the stack by the dialect's nesting limit. A failed parse is
    // abandoned, so only successful paths `ascend` again.
    fn descend(&mut self, token: &Token) -> Result<(), CompileError> {
        self.enter("nesting", token)
    }

    // Operator chains build a left-deep tree that later walks recurse
    // through, so each operator spends the same budget as a nesting level.
    fn descend_chain(&mut self, token: &Token) -> Result<(), CompileError> {
        self.enter("arithmetic chain", token)
    }

    fn enter(&mut self, what: &str, token: &Token) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > self.dialect.max_depth {
            return Err(semantic_error(
                format!("{} exceeds the maximum depth of {}", what, self.dialect.max_depth),
                token,
            ));
        }

        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Comma separated, non-empty list closed by `)`; the opening
    /// parenthesis is already consumed.
    fn parse_list<T, F>(&mut self, open: &Token, mut item: F) -> Result<Vec<T>, CompileError>
    where
        F: FnMut(&mut Self) -> Result<T, CompileError>,
    {
        let mut items = vec![];

        loop {
            items.push(item(self)?);

            let token = self.next();
            match token.get_kind() {
                TKind::Punct(Punct::Comma) => (),
                TKind::Punct(Punct::RParen) => return Ok(items),
                TKind::End => return Err(unclosed(open)),
                _ => return Err(unexp_token(token, "`,` or `)`")),
            }
        }
    }

    fn parse_logical(&mut self, op: LogicalOp) -> Result<Parsed, CompileError> {
        let kw = match op {
            LogicalOp::Or => Kw::Or,
            LogicalOp::And => Kw::And,
        };
        let operand: fn(&mut Self) -> Result<Parsed, CompileError> = match op {
            LogicalOp::Or => Self::parse_and,
            LogicalOp::And => Self::parse_not,
        };

        let start = self.peek();
        let first = operand(self)?;
        if self.peek().get_kind() != &TKind::Keyword(kw) {
            return Ok(first);
        }

        let mut operands = vec![require_filter(first, start)?];
        while self.eat_kw(kw) {
            let start = self.peek();
            let parsed = operand(self)?;
            operands.push(require_filter(parsed, start)?);
        }

        Ok(Parsed::Filter(Filter::logical(op, operands)))
    }

    fn parse_or(&mut self) -> Result<Parsed, CompileError> {
        let start = self.peek();
        self.descend(start)?;

        let parsed = self.parse_logical(LogicalOp::Or)?;

        self.ascend();
        Ok(parsed)
    }

    fn parse_and(&mut self) -> Result<Parsed, CompileError> {
        self.parse_logical(LogicalOp::And)
    }

    fn parse_not(&mut self) -> Result<Parsed, CompileError> {
        if self.peek().get_kind() != &TKind::Keyword(Kw::Not) {
            return self.parse_predicate();
        }

        let not = self.next();
        self.descend(not)?;

        let start = self.peek();
        let parsed = self.parse_not()?;
        let operand = require_filter(parsed, start)?;

        self.ascend();
        Ok(Parsed::Filter(Filter::not(operand)))
    }

    fn parse_predicate(&mut self) -> Result<Parsed, CompileError> {
        let left = match self.parse_additive()? {
            Parsed::Expression(expression) => expression,
            filter => return Ok(filter),
        };

        let token = self.peek();
        let filter = match token.get_kind() {
            TKind::Operator(op) => match comparison_op(*op) {
                Some(op) => {
                    self.next();
                    let right = self.parse_operand()?;
                    Filter::compare(op, left, right)
                },
                None => return Ok(Parsed::Expression(left)),
            },

            TKind::Keyword(Kw::Like)
            | TKind::Keyword(Kw::ILike)
            | TKind::Keyword(Kw::Between)
            | TKind::Keyword(Kw::In)
            | TKind::Keyword(Kw::Is) => {
                self.next();
                self.parse_predicate_tail(left, token)?
            },

            TKind::Keyword(Kw::Not) => {
                self.next();
                let keyword = self.next();
                match keyword.get_kind() {
                    TKind::Keyword(Kw::Like)
                    | TKind::Keyword(Kw::ILike)
                    | TKind::Keyword(Kw::Between)
                    | TKind::Keyword(Kw::In) => Filter::not(self.parse_predicate_tail(left, keyword)?),
                    _ => return Err(unexp_token(keyword, "`LIKE`, `ILIKE`, `BETWEEN` or `IN`")),
                }
            },

            _ => return Ok(Parsed::Expression(left)),
        };

        let next = self.peek();
        if is_predicate_token(next.get_kind()) {
            return Err(syntax_error(
                format!("unexpected {}, comparisons cannot be chained", next.get_kind()),
                next,
            ));
        }

        Ok(Parsed::Filter(filter))
    }

    /// Rest of a predicate whose keyword was just consumed.
    fn parse_predicate_tail(&mut self, expression: Expression, keyword: &'a Token) -> Result<Filter, CompileError> {
        let filter = match keyword.get_kind() {
            TKind::Keyword(Kw::Like) => self.parse_like(expression, true)?,
            TKind::Keyword(Kw::ILike) => self.parse_like(expression, false)?,

            TKind::Keyword(Kw::Between) => {
                let lower = self.parse_operand()?;
                self.expect_kw(Kw::And)?;
                let upper = self.parse_operand()?;

                Filter::Between { expression, lower, upper }
            },

            TKind::Keyword(Kw::In) => {
                let open = self.expect_punct(Punct::LParen)?;
                if self.peek().get_kind() == &TKind::Punct(Punct::RParen) {
                    return Err(semantic_error("`IN` requires at least one value".to_string(), open));
                }

                let values = self.parse_arguments(open)?;
                Filter::In { expression, values }
            },

            TKind::Keyword(Kw::Is) => {
                let negated = self.eat_kw(Kw::Not);
                self.expect_kw(Kw::Null)?;

                match negated {
                    true => Filter::not(Filter::IsNull(expression)),
                    false => Filter::IsNull(expression),
                }
            },

            _ => return Err(unexp_token(keyword, "a predicate")),
        };

        Ok(filter)
    }

    fn parse_like(&mut self, expression: Expression, match_case: bool) -> Result<Filter, CompileError> {
        let token = self.next();
        let pattern = match token.get_kind() {
            TKind::Str(pattern) => pattern.clone(),
            _ => return Err(unexp_token(token, "a string pattern")),
        };

        let like = self.dialect.like;
        Ok(Filter::Like(Like {
            expression,
            pattern,
            wildcard: like.wildcard,
            single_char: like.single_char,
            escape: like.escape,
            match_case,
        }))
    }

    /// An expression in a position where predicates are not allowed.
    fn parse_operand(&mut self) -> Result<Expression, CompileError> {
        let start = self.peek();
        let parsed = self.parse_additive()?;

        require_expression(parsed, start)
    }

    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Parsed, CompileError>,
        operator: fn(&TokenKind) -> Option<ArithmeticOp>,
    ) -> Result<Parsed, CompileError> {
        let start = self.peek();
        let mut left = operand(self)?;
        let mut levels = 0;

        while let Some(op) = operator(self.peek().get_kind()) {
            // Left-associative chains deepen the tree without recursing here
            let token = self.next();
            self.descend_chain(token)?;
            levels += 1;

            let lhs = require_expression(left, start)?;
            let right_start = self.peek();
            let right = operand(self)?;
            let rhs = require_expression(right, right_start)?;

            left = Parsed::Expression(Expression::arithmetic(op, lhs, rhs));
        }

        self.depth -= levels;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Parsed, CompileError> {
        self.parse_binary(Self::parse_multiplicative, additive_op)
    }

    fn parse_multiplicative(&mut self) -> Result<Parsed, CompileError> {
        self.parse_binary(Self::parse_unary, multiplicative_op)
    }

    fn parse_unary(&mut self) -> Result<Parsed, CompileError> {
        if self.peek().get_kind() != &TKind::Operator(Op::Minus) {
            return self.parse_primary();
        }

        let minus = self.next();
        let token = self.peek();
        if let TKind::Number(text) = token.get_kind() {
            self.next();
            return Ok(Parsed::Expression(Expression::Literal(
                number_literal(text, true, token)?
            )));
        }

        self.descend(minus)?;
        let parsed = self.parse_unary()?;
        let operand = require_expression(parsed, token)?;
        self.ascend();

        Ok(Parsed::Expression(Expression::arithmetic(
            ArithmeticOp::Subtract,
            Expression::integer(0),
            operand,
        )))
    }

    fn parse_primary(&mut self) -> Result<Parsed, CompileError> {
        let token = self.next();

        let expression = match token.get_kind() {
            TKind::Number(text) => Expression::Literal(number_literal(text, false, token)?),
            TKind::Str(s) => Expression::string(s.clone()),
            TKind::Keyword(Kw::True) => Expression::Literal(Literal::Boolean(true)),
            TKind::Keyword(Kw::False) => Expression::Literal(Literal::Boolean(false)),
            TKind::Keyword(Kw::Null) => Expression::Literal(Literal::Null),

            TKind::Identifier(name) if self.peek().get_kind() == &TKind::Punct(Punct::LParen) => {
                let open = self.next();
                let args = match self.eat(&TKind::Punct(Punct::RParen)) {
                    true => vec![],
                    false => self.parse_arguments(open)?,
                };

                validation::check_function(name, args.len(), token, self.dialect)?;
                Expression::function(name.clone(), args)
            },
            TKind::Identifier(name) | TKind::QuotedIdentifier(name) => {
                Expression::property(self.parse_path(name)?)
            },

            TKind::Keyword(Kw::Geometry(kind)) => {
                Expression::geometry(self.parse_geometry(*kind, token)?)
            },

            TKind::Keyword(Kw::Spatial(op)) => {
                let open = self.expect_punct(Punct::LParen)?;
                let args = match self.eat(&TKind::Punct(Punct::RParen)) {
                    true => vec![],
                    false => self.parse_arguments(open)?,
                };

                let predicate = validation::check_spatial(*op, args, token)?;
                return Ok(Parsed::Filter(Filter::Spatial(predicate)));
            },

            TKind::Keyword(Kw::Include) => return Ok(Parsed::Filter(Filter::Include)),
            TKind::Keyword(Kw::Exclude) => return Ok(Parsed::Filter(Filter::Exclude)),
            TKind::Keyword(Kw::In) => return Ok(Parsed::Filter(self.parse_ids()?)),

            TKind::Punct(Punct::LParen) => {
                let parsed = self.parse_or()?;
                self.close(token)?;
                return Ok(parsed);
            },

            _ => return Err(unexp_token(token, "an expression")),
        };

        Ok(Parsed::Expression(expression))
    }

    /// Joins a dotted property path, `a.b.c`, into one property name.
    fn parse_path(&mut self, head: &str) -> Result<String, CompileError> {
        let mut path = head.to_string();

        while self.eat(&TKind::Punct(Punct::Dot)) {
            let token = self.next();
            match token.get_kind() {
                TKind::Identifier(segment) | TKind::QuotedIdentifier(segment) => {
                    path.push('.');
                    path.push_str(segment);
                },
                _ => return Err(unexp_token(token, "a property name")),
            }
        }

        Ok(path)
    }

    /// Call arguments after a consumed `(`, up to and including `)`.
    fn parse_arguments(&mut self, open: &'a Token) -> Result<Vec<Expression>, CompileError> {
        self.descend(open)?;
        let args = self.parse_list(open, Self::parse_operand)?;
        self.ascend();

        Ok(args)
    }

    /// Feature identifier list of `IN ('id.1', 'id.2')`.
    fn parse_ids(&mut self) -> Result<Filter, CompileError> {
        let open = self.expect_punct(Punct::LParen)?;
        if self.peek().get_kind() == &TKind::Punct(Punct::RParen) {
            return Err(semantic_error("`IN` requires at least one value".to_string(), open));
        }

        let ids = self.parse_list(open, |parser| {
            let token = parser.next();
            match token.get_kind() {
                TKind::Str(id) | TKind::Number(id) => Ok(id.clone()),
                _ => Err(unexp_token(token, "a feature identifier")),
            }
        })?;

        Ok(Filter::Id(ids))
    }

    fn parse_geometry(&mut self, kind: GeometryType, token: &'a Token) -> Result<Geometry, CompileError> {
        if self.eat_kw(Kw::Empty) {
            return Geometry::empty(kind).ok_or_else(|| {
                semantic_error(format!("{} cannot be EMPTY", kind.name()), token)
            });
        }

        let open = self.expect_punct(Punct::LParen)?;

        let geometry = match kind {
            GeometryType::Point => {
                let coordinate = self.parse_coordinate()?;
                self.close(open)?;
                Geometry::Point(Some(coordinate))
            },
            GeometryType::LineString => Geometry::LineString(
                self.parse_list(open, Self::parse_coordinate)?
            ),
            GeometryType::Polygon => Geometry::Polygon(
                self.parse_list(open, Self::parse_ring)?
            ),
            GeometryType::MultiPoint => Geometry::MultiPoint(
                self.parse_list(open, Self::parse_multi_point_member)?
            ),
            GeometryType::MultiLineString => Geometry::MultiLineString(
                self.parse_list(open, Self::parse_ring)?
            ),
            GeometryType::MultiPolygon => Geometry::MultiPolygon(
                self.parse_list(open, Self::parse_polygon_rings)?
            ),
            GeometryType::GeometryCollection => {
                self.descend(token)?;
                let members = self.parse_list(open, Self::parse_collection_member)?;
                self.ascend();

                Geometry::GeometryCollection(members)
            },
            GeometryType::Envelope => {
                // ENVELOPE(minx, maxx, maxy, miny)
                let min_x = self.parse_signed_number()?;
                self.expect_punct(Punct::Comma)?;
                let max_x = self.parse_signed_number()?;
                self.expect_punct(Punct::Comma)?;
                let max_y = self.parse_signed_number()?;
                self.expect_punct(Punct::Comma)?;
                let min_y = self.parse_signed_number()?;
                self.close(open)?;

                Geometry::Envelope(Envelope::new(min_x, min_y, max_x, max_y))
            },
        };

        validation::check_geometry(&geometry, token)?;
        Ok(geometry)
    }

    fn parse_signed_number(&mut self) -> Result<f64, CompileError> {
        let negative = self.eat(&TKind::Operator(Op::Minus));

        let token = self.next();
        match token.get_kind() {
            TKind::Number(text) => {
                let num = text.parse::<f64>().map_err(|e| {
                    semantic_error(format!("invalid coordinate `{}`", text), token).with_cause(e)
                })?;
                Ok(if negative { -num } else { num })
            },
            _ => Err(unexp_token(token, "a coordinate")),
        }
    }

    fn parse_coordinate(&mut self) -> Result<Coordinate, CompileError> {
        let x = self.parse_signed_number()?;
        let y = self.parse_signed_number()?;

        let z = match self.peek().get_kind() {
            TKind::Number(_) | TKind::Operator(Op::Minus) => Some(self.parse_signed_number()?),
            _ => None,
        };

        Ok(Coordinate { x, y, z })
    }

    fn parse_ring(&mut self) -> Result<Ring, CompileError> {
        let open = self.expect_punct(Punct::LParen)?;
        self.parse_list(open, Self::parse_coordinate)
    }

    fn parse_polygon_rings(&mut self) -> Result<Vec<Ring>, CompileError> {
        let open = self.expect_punct(Punct::LParen)?;
        self.parse_list(open, Self::parse_ring)
    }

    // Both `MULTIPOINT(1 2, 3 4)` and `MULTIPOINT((1 2), (3 4))` are accepted
    fn parse_multi_point_member(&mut self) -> Result<Coordinate, CompileError> {
        let token = self.peek();
        if !self.eat(&TKind::Punct(Punct::LParen)) {
            return self.parse_coordinate();
        }

        let coordinate = self.parse_coordinate()?;
        self.close(token)?;

        Ok(coordinate)
    }

    fn parse_collection_member(&mut self) -> Result<Geometry, CompileError> {
        let token = self.next();
        match token.get_kind() {
            TKind::Keyword(Kw::Geometry(kind)) => self.parse_geometry(*kind, token),
            _ => Err(unexp_token(token, "a geometry")),
        }
    }
}

#[cfg(test)]
mod tests;
