//! CQL text generation.
//!
//! The output parses back, under the same dialect, to a tree equal to the
//! one written. Parentheses appear only where precedence needs them and
//! around logical operands nested in another logical node.

use super::filter::*;
use super::geometry::{Coordinate, Geometry};
use super::lexer::{guess_word, is_word_char};
use super::tokens::TKind;
use crate::config::{default_dialect, Dialect, LikeConfig};

use std::fmt;

/// Anything the writer can render.
#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    Filter(&'a Filter),
    Expression(&'a Expression),
}

impl<'a> From<&'a Filter> for Node<'a> {
    fn from(filter: &'a Filter) -> Self {
        Node::Filter(filter)
    }
}

impl<'a> From<&'a Expression> for Node<'a> {
    fn from(expression: &'a Expression) -> Self {
        Node::Expression(expression)
    }
}

/// Writes a node with the default dialect.
pub fn write<'a>(node: impl Into<Node<'a>>) -> String {
    Writer::new(default_dialect()).write(node)
}

#[derive(Clone, Copy, Debug)]
pub struct Writer<'d> {
    dialect: &'d Dialect,
}

struct Written<'w, 'a> {
    writer: &'w Writer<'w>,
    node: Node<'a>,
}

impl fmt::Display for Written<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Node::Filter(filter) => self.writer.fmt_filter(f, filter),
            Node::Expression(expression) => self.writer.fmt_expression(f, expression),
        }
    }
}

impl<'d> Writer<'d> {
    pub fn new(dialect: &'d Dialect) -> Writer<'d> {
        Writer { dialect }
    }

    pub fn write<'a>(&self, node: impl Into<Node<'a>>) -> String {
        Written { writer: self, node: node.into() }.to_string()
    }

    fn fmt_filter(&self, f: &mut fmt::Formatter<'_>, filter: &Filter) -> fmt::Result {
        match filter {
            Filter::Include => f.write_str("INCLUDE"),
            Filter::Exclude => f.write_str("EXCLUDE"),

            Filter::Comparison { op, left, right } => {
                self.fmt_expression(f, left)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_expression(f, right)
            },

            Filter::Like(like) => {
                self.fmt_expression(f, &like.expression)?;
                f.write_str(if like.match_case { " LIKE " } else { " ILIKE " })?;
                fmt_string(f, &translate_pattern(like, &self.dialect.like))
            },

            Filter::Between { expression, lower, upper } => {
                self.fmt_expression(f, expression)?;
                f.write_str(" BETWEEN ")?;
                self.fmt_expression(f, lower)?;
                f.write_str(" AND ")?;
                self.fmt_expression(f, upper)
            },

            Filter::IsNull(expression) => {
                self.fmt_expression(f, expression)?;
                f.write_str(" IS NULL")
            },

            Filter::In { expression, values } => {
                self.fmt_expression(f, expression)?;
                f.write_str(" IN (")?;
                self.fmt_arguments(f, values)?;
                f.write_str(")")
            },

            Filter::Id(ids) => {
                f.write_str("IN (")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_string(f, id)?;
                }
                f.write_str(")")
            },

            Filter::Spatial(predicate) => self.fmt_spatial(f, predicate),

            Filter::Logical(logical) => {
                let separator = format!(" {} ", logical.op().name());
                for (i, operand) in logical.operands().iter().enumerate() {
                    if i > 0 {
                        f.write_str(&separator)?;
                    }
                    self.fmt_grouped(f, operand)?;
                }
                Ok(())
            },

            Filter::Not(operand) => {
                f.write_str("NOT ")?;
                self.fmt_grouped(f, operand)
            },
        }
    }

    // Logical nodes are parenthesized wherever they appear as an operand
    fn fmt_grouped(&self, f: &mut fmt::Formatter<'_>, filter: &Filter) -> fmt::Result {
        match filter {
            Filter::Logical(_) => {
                f.write_str("(")?;
                self.fmt_filter(f, filter)?;
                f.write_str(")")
            },
            _ => self.fmt_filter(f, filter),
        }
    }

    fn fmt_spatial(&self, f: &mut fmt::Formatter<'_>, predicate: &SpatialPredicate) -> fmt::Result {
        write!(f, "{}(", predicate.op().name())?;

        match predicate {
            SpatialPredicate::Binary { left, right, .. } => {
                self.fmt_expression(f, left)?;
                f.write_str(", ")?;
                self.fmt_expression(f, right)?;
            },

            SpatialPredicate::Distance { left, right, distance, units, .. } => {
                self.fmt_expression(f, left)?;
                f.write_str(", ")?;
                self.fmt_expression(f, right)?;
                write!(f, ", {:?}, ", distance)?;
                match self.is_plain_word(units) {
                    true => f.write_str(units)?,
                    false => fmt_string(f, units)?,
                }
            },

            SpatialPredicate::BBox { expression, envelope, crs } => {
                self.fmt_expression(f, expression)?;
                write!(
                    f,
                    ", {:?}, {:?}, {:?}, {:?}",
                    envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y
                )?;
                if let Some(crs) = crs {
                    f.write_str(", ")?;
                    fmt_string(f, crs)?;
                }
            },

            SpatialPredicate::Relate { left, right, pattern } => {
                self.fmt_expression(f, left)?;
                f.write_str(", ")?;
                self.fmt_expression(f, right)?;
                f.write_str(", ")?;
                fmt_string(f, pattern)?;
            },
        }

        f.write_str(")")
    }

    fn fmt_expression(&self, f: &mut fmt::Formatter<'_>, expression: &Expression) -> fmt::Result {
        match expression {
            Expression::Literal(literal) => fmt_literal(f, literal),
            Expression::Property(name) => self.fmt_property(f, name),

            Expression::Arithmetic { op, left, right } => {
                self.fmt_operand(f, left, op.precedence(), false)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_operand(f, right, op.precedence(), true)
            },

            Expression::Function { name, args } => {
                write!(f, "{}(", name)?;
                self.fmt_arguments(f, args)?;
                f.write_str(")")
            },
        }
    }

    // Operators are left-associative: a right operand of equal precedence
    // needs parentheses, a left one does not.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, operand: &Expression, parent: u8, right: bool) -> fmt::Result {
        let wrap = match operand {
            Expression::Arithmetic { op, .. } => {
                op.precedence() < parent || (right && op.precedence() == parent)
            },
            _ => false,
        };

        if !wrap {
            return self.fmt_expression(f, operand);
        }

        f.write_str("(")?;
        self.fmt_expression(f, operand)?;
        f.write_str(")")
    }

    fn fmt_arguments(&self, f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.fmt_expression(f, arg)?;
        }

        Ok(())
    }

    fn fmt_property(&self, f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
        if name.split('.').all(|segment| self.is_plain_word(segment)) {
            return f.write_str(name);
        }

        write!(f, "\"{}\"", name.replace('"', "\"\""))
    }

    /// A word the lexer reads back as the same identifier.
    fn is_plain_word(&self, word: &str) -> bool {
        let mut chars = word.chars();
        let starts_well = chars.next().map_or(false, |c| c.is_alphabetic() || c == '_');

        starts_well
            && chars.all(is_word_char)
            && matches!(guess_word(word, self.dialect), TKind::Identifier(_))
    }
}

fn fmt_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "'{}'", s.replace('\'', "''"))
}

fn fmt_literal(f: &mut fmt::Formatter<'_>, literal: &Literal) -> fmt::Result {
    match literal {
        Literal::Integer(num) => write!(f, "{}", num),
        // Debug output always keeps a `.` or an exponent
        Literal::Float(num) => write!(f, "{:?}", num),
        Literal::String(s) => fmt_string(f, s),
        Literal::Boolean(true) => f.write_str("TRUE"),
        Literal::Boolean(false) => f.write_str("FALSE"),
        Literal::Null => f.write_str("NULL"),
        Literal::Geometry(geometry) => fmt_geometry(f, geometry),
    }
}

fn fmt_coordinate(f: &mut fmt::Formatter<'_>, c: &Coordinate) -> fmt::Result {
    write!(f, "{} {}", c.x, c.y)?;
    if let Some(z) = c.z {
        write!(f, " {}", z)?;
    }

    Ok(())
}

fn fmt_coordinates(f: &mut fmt::Formatter<'_>, coords: &[Coordinate]) -> fmt::Result {
    f.write_str("(")?;
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        fmt_coordinate(f, c)?;
    }
    f.write_str(")")
}

fn fmt_rings(f: &mut fmt::Formatter<'_>, rings: &[Vec<Coordinate>]) -> fmt::Result {
    f.write_str("(")?;
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        fmt_coordinates(f, ring)?;
    }
    f.write_str(")")
}

fn fmt_geometry(f: &mut fmt::Formatter<'_>, geometry: &Geometry) -> fmt::Result {
    if let Geometry::Envelope(envelope) = geometry {
        return write!(
            f,
            "ENVELOPE({}, {}, {}, {})",
            envelope.min_x, envelope.max_x, envelope.max_y, envelope.min_y
        );
    }

    f.write_str(geometry.geometry_type().name())?;
    if geometry.is_empty() {
        return f.write_str(" EMPTY");
    }

    match geometry {
        Geometry::Point(Some(c)) => {
            f.write_str("(")?;
            fmt_coordinate(f, c)?;
            f.write_str(")")
        },
        Geometry::LineString(coords) | Geometry::MultiPoint(coords) => fmt_coordinates(f, coords),
        Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => fmt_rings(f, rings),

        Geometry::MultiPolygon(polygons) => {
            f.write_str("(")?;
            for (i, rings) in polygons.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_rings(f, rings)?;
            }
            f.write_str(")")
        },

        Geometry::GeometryCollection(members) => {
            f.write_str("(")?;
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_geometry(f, member)?;
            }
            f.write_str(")")
        },

        Geometry::Point(None) | Geometry::Envelope(_) => Ok(()),
    }
}

/// Rewrites a LIKE pattern from the wildcards it was parsed with to the
/// ones of `target`, escaping characters that become special.
fn translate_pattern(like: &Like, target: &LikeConfig) -> String {
    let mut pattern = String::with_capacity(like.pattern.len());
    let mut chars = like.pattern.chars();

    while let Some(c) = chars.next() {
        if c == like.escape {
            pattern.push(target.escape);
            if let Some(escaped) = chars.next() {
                pattern.push(escaped);
            }
        } else if c == like.wildcard {
            pattern.push(target.wildcard);
        } else if c == like.single_char {
            pattern.push(target.single_char);
        } else if target.is_special(c) {
            pattern.push(target.escape);
            pattern.push(c);
        } else {
            pattern.push(c);
        }
    }

    pattern
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Writer::new(default_dialect()).fmt_filter(f, self)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Writer::new(default_dialect()).fmt_expression(f, self)
    }
}
