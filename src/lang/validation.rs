use super::error::{CompileError, ErrorKind};
use super::filter::*;
use super::geometry::{Coordinate, Envelope, Geometry};
use super::tokens::Token;
use crate::config::{Arity, Dialect};

use std::convert::TryInto;

fn semantic_error(message: String, token: &Token) -> CompileError {
    CompileError::report(ErrorKind::Semantic, message, token.position())
}

fn describe_arity(arity: &Arity) -> String {
    let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };

    match (arity.min, arity.max) {
        (min, Some(max)) if min == max => format!("{} {}", min, plural(min)),
        (min, Some(max)) if max == min + 1 => format!("{} or {} arguments", min, max),
        (min, Some(max)) => format!("{} to {} arguments", min, max),
        (min, None) => format!("at least {} {}", min, plural(min)),
    }
}

fn describe_given(given: usize) -> String {
    match given {
        1 => "1 was given".to_string(),
        n => format!("{} were given", n),
    }
}

fn arity_error(what: &str, arity: &Arity, given: usize, token: &Token) -> CompileError {
    semantic_error(
        format!("{} expects {} but {}", what, describe_arity(arity), describe_given(given)),
        token,
    )
}

pub fn check_function(name: &str, given: usize, token: &Token, dialect: &Dialect) -> Result<(), CompileError> {
    match dialect.function_arity(name) {
        Some(arity) if !arity.accepts(given) => Err(
            arity_error(&format!("function `{}`", name), &arity, given, token)
        ),
        None if dialect.strict_functions => Err(
            semantic_error(format!("unknown function `{}`", name), token)
        ),
        _ => Ok(()),
    }
}

pub fn spatial_arity(op: SpatialOp) -> Arity {
    match op {
        SpatialOp::DWithin | SpatialOp::Beyond => Arity::exactly(4),
        SpatialOp::BBox => Arity::between(5, 6),
        SpatialOp::Relate => Arity::exactly(3),
        _ => Arity::exactly(2),
    }
}

/// Checks arity and argument shapes of a spatial predicate call and builds
/// the predicate node.
pub fn check_spatial(op: SpatialOp, mut args: Vec<Expression>, token: &Token) -> Result<SpatialPredicate, CompileError> {
    let arity = spatial_arity(op);
    if !arity.accepts(args.len()) {
        return Err(arity_error(
            &format!("spatial predicate `{}`", op.name()),
            &arity,
            args.len(),
            token,
        ));
    }

    let count = args.len();
    let mismatch = |_| arity_error(&format!("spatial predicate `{}`", op.name()), &arity, count, token);

    let predicate = match op {
        SpatialOp::BBox => {
            let crs = match args.len() {
                6 => match args.pop() {
                    Some(Expression::Literal(Literal::String(crs))) => Some(crs),
                    _ => return Err(argument_error(op, "crs", "a string literal", token)),
                },
                _ => None,
            };

            let [expression, min_x, min_y, max_x, max_y]: [Expression; 5] = args.try_into().map_err(mismatch)?;
            check_geometry_operand(op, 1, &expression, token)?;

            let envelope = Envelope::new(
                number_arg(op, "minx", &min_x, token)?,
                number_arg(op, "miny", &min_y, token)?,
                number_arg(op, "maxx", &max_x, token)?,
                number_arg(op, "maxy", &max_y, token)?,
            );
            if inverted(&envelope) {
                return Err(semantic_error(
                    "BBOX minimum exceeds its maximum".to_string(),
                    token,
                ));
            }

            SpatialPredicate::BBox { expression, envelope, crs }
        },

        SpatialOp::DWithin | SpatialOp::Beyond => {
            let [left, right, distance, units]: [Expression; 4] = args.try_into().map_err(mismatch)?;
            check_geometry_operand(op, 1, &left, token)?;
            check_geometry_operand(op, 2, &right, token)?;

            let distance = number_arg(op, "distance", &distance, token)?;
            if distance < 0.0 {
                return Err(semantic_error(
                    format!("distance of `{}` cannot be negative", op.name()),
                    token,
                ));
            }

            let units = match units {
                Expression::Property(units) => units,
                Expression::Literal(Literal::String(units)) => units,
                _ => return Err(argument_error(op, "units", "a unit name", token)),
            };

            SpatialPredicate::Distance { op, left, right, distance, units }
        },

        SpatialOp::Relate => {
            let [left, right, pattern]: [Expression; 3] = args.try_into().map_err(mismatch)?;
            check_geometry_operand(op, 1, &left, token)?;
            check_geometry_operand(op, 2, &right, token)?;

            let pattern = match pattern {
                Expression::Literal(Literal::String(pattern)) => pattern,
                _ => return Err(argument_error(op, "pattern", "a string literal", token)),
            };

            let valid = pattern.chars().count() == 9
                && pattern.chars().all(|c| matches!(c.to_ascii_uppercase(), 'T' | 'F' | '*' | '0' | '1' | '2'));
            if !valid {
                return Err(semantic_error(
                    "invalid DE-9IM intersection pattern for `RELATE`".to_string(),
                    token,
                ));
            }

            SpatialPredicate::Relate { left, right, pattern }
        },

        _ => {
            let [left, right]: [Expression; 2] = args.try_into().map_err(mismatch)?;
            check_geometry_operand(op, 1, &left, token)?;
            check_geometry_operand(op, 2, &right, token)?;

            SpatialPredicate::Binary { op, left, right }
        },
    };

    Ok(predicate)
}

fn argument_error(op: SpatialOp, name: &str, expected: &str, token: &Token) -> CompileError {
    semantic_error(
        format!("argument `{}` of `{}` must be {}", name, op.name(), expected),
        token,
    )
}

fn number_arg(op: SpatialOp, name: &str, arg: &Expression, token: &Token) -> Result<f64, CompileError> {
    arg.as_literal()
        .and_then(Literal::as_f64)
        .ok_or_else(|| argument_error(op, name, "a numeric literal", token))
}

// Properties and functions are resolved downstream; only literals can be
// rejected here.
fn check_geometry_operand(op: SpatialOp, index: usize, arg: &Expression, token: &Token) -> Result<(), CompileError> {
    match arg {
        Expression::Literal(Literal::Geometry(_)) | Expression::Property(_) | Expression::Function { .. } => Ok(()),
        _ => Err(semantic_error(
            format!(
                "argument {} of `{}` must be a geometry, property or function",
                index,
                op.name()
            ),
            token,
        )),
    }
}

fn inverted(envelope: &Envelope) -> bool {
    envelope.min_x > envelope.max_x || envelope.min_y > envelope.max_y
}

pub fn check_geometry(geometry: &Geometry, token: &Token) -> Result<(), CompileError> {
    match geometry {
        Geometry::LineString(coords) => check_line(coords, token),
        Geometry::MultiLineString(lines) => lines.iter().try_for_each(|l| check_line(l, token)),
        Geometry::Polygon(rings) => rings.iter().try_for_each(|r| check_ring(r, token)),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .flat_map(|rings| rings.iter())
            .try_for_each(|r| check_ring(r, token)),
        Geometry::GeometryCollection(members) => members.iter().try_for_each(|g| check_geometry(g, token)),
        Geometry::Envelope(envelope) => {
            if inverted(envelope) {
                return Err(semantic_error(
                    "ENVELOPE minimum exceeds its maximum".to_string(),
                    token,
                ));
            }
            Ok(())
        },
        Geometry::Point(_) | Geometry::MultiPoint(_) => Ok(()),
    }
}

fn check_line(coords: &[Coordinate], token: &Token) -> Result<(), CompileError> {
    if coords.len() < 2 {
        return Err(semantic_error(
            "LINESTRING requires at least 2 points".to_string(),
            token,
        ));
    }

    Ok(())
}

fn check_ring(ring: &[Coordinate], token: &Token) -> Result<(), CompileError> {
    if ring.len() < 4 {
        return Err(semantic_error(
            "POLYGON ring requires at least 4 points".to_string(),
            token,
        ));
    }

    if ring.first() != ring.last() {
        return Err(semantic_error("POLYGON ring is not closed".to_string(), token));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::tokens::TKind;

    fn token() -> Token {
        Token::new(TKind::Identifier("f".to_string()), "f", 1, 1, 0)
    }

    #[test]
    fn function_arity_messages() {
        let dialect = Dialect::default();

        let err = check_function("strLength", 2, &token(), &dialect).unwrap_err();
        assert_eq!(err.message(), "function `strLength` expects 1 argument but 2 were given");

        let err = check_function("round", 0, &token(), &dialect).unwrap_err();
        assert_eq!(err.message(), "function `round` expects 1 or 2 arguments but 0 were given");

        let err = check_function("strConcat", 1, &token(), &dialect).unwrap_err();
        assert_eq!(err.message(), "function `strConcat` expects at least 2 arguments but 1 was given");

        assert!(check_function("strConcat", 5, &token(), &dialect).is_ok());
        assert!(check_function("unknown", 5, &token(), &dialect).is_ok());
    }

    #[test]
    fn strict_functions() {
        let dialect = Dialect {
            strict_functions: true,
            ..Dialect::default()
        };

        let err = check_function("frobnicate", 1, &token(), &dialect).unwrap_err();
        assert_eq!(err.message(), "unknown function `frobnicate`");
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn spatial_arity_message() {
        let args = vec![Expression::property("geom")];
        let err = check_spatial(SpatialOp::BBox, args, &token()).unwrap_err();
        assert_eq!(err.message(), "spatial predicate `BBOX` expects 5 or 6 arguments but 1 was given");
    }

    #[test]
    fn bbox_bounds_must_be_numeric() {
        let args = vec![
            Expression::property("geom"),
            Expression::integer(0),
            Expression::property("y"),
            Expression::integer(1),
            Expression::integer(1),
        ];
        let err = check_spatial(SpatialOp::BBox, args, &token()).unwrap_err();
        assert_eq!(err.message(), "argument `miny` of `BBOX` must be a numeric literal");
    }

    #[test]
    fn bbox_bounds_must_be_ordered() {
        let args = |min_x: i64, min_y: i64, max_x: i64, max_y: i64| vec![
            Expression::property("geom"),
            Expression::integer(min_x),
            Expression::integer(min_y),
            Expression::integer(max_x),
            Expression::integer(max_y),
        ];

        let err = check_spatial(SpatialOp::BBox, args(10, 10, 0, 0), &token()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "BBOX minimum exceeds its maximum");

        assert!(check_spatial(SpatialOp::BBox, args(0, 10, 10, 0), &token()).is_err());
        assert!(check_spatial(SpatialOp::BBox, args(0, 0, 0, 0), &token()).is_ok());
    }

    #[test]
    fn relate_pattern() {
        let args = |pattern: &str| vec![
            Expression::property("a"),
            Expression::property("b"),
            Expression::string(pattern),
        ];

        assert!(check_spatial(SpatialOp::Relate, args("T*F**F***"), &token()).is_ok());
        assert!(check_spatial(SpatialOp::Relate, args("T*F"), &token()).is_err());
        assert!(check_spatial(SpatialOp::Relate, args("X********"), &token()).is_err());
    }

    #[test]
    fn open_ring_is_rejected() {
        let ring = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(0.0, 1.0),
        ];

        let err = check_geometry(&Geometry::Polygon(vec![ring]), &token()).unwrap_err();
        assert_eq!(err.message(), "POLYGON ring is not closed");
    }
}
