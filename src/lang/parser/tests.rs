use super::*;
use crate::config::default_dialect;
use crate::lang::lexer::extract_tokens;

fn filter_with(src: &str, dialect: &Dialect) -> Result<Filter, CompileError> {
    let tokens = extract_tokens(src, dialect)?;
    build_filter(tokens.iter(), dialect)
}

fn filter(src: &str) -> Filter {
    filter_with(src, default_dialect()).unwrap()
}

fn filter_err(src: &str) -> CompileError {
    filter_with(src, default_dialect()).unwrap_err()
}

fn expression_with(src: &str, dialect: &Dialect) -> Result<Expression, CompileError> {
    let tokens = extract_tokens(src, dialect)?;
    build_expression(tokens.iter(), dialect)
}

fn expression(src: &str) -> Expression {
    expression_with(src, default_dialect()).unwrap()
}

fn prop(name: &str) -> Expression {
    Expression::property(name)
}

fn int(num: i64) -> Expression {
    Expression::integer(num)
}

fn cmp(op: ComparisonOp, left: Expression, right: Expression) -> Filter {
    Filter::compare(op, left, right)
}

mod expression_tests {
    use super::*;

    #[test]
    fn precedence() {
        assert_eq!(
            expression("1+2*3"),
            Expression::arithmetic(
                ArithmeticOp::Add,
                int(1),
                Expression::arithmetic(ArithmeticOp::Multiply, int(2), int(3)),
            )
        );

        assert_eq!(
            expression("(1+2)*3"),
            Expression::arithmetic(
                ArithmeticOp::Multiply,
                Expression::arithmetic(ArithmeticOp::Add, int(1), int(2)),
                int(3),
            )
        );
    }

    #[test]
    fn left_associative() {
        assert_eq!(
            expression("10 - 4 - 3"),
            Expression::arithmetic(
                ArithmeticOp::Subtract,
                Expression::arithmetic(ArithmeticOp::Subtract, int(10), int(4)),
                int(3),
            )
        );
    }

    #[test]
    fn literals() {
        assert_eq!(expression("42"), int(42));
        assert_eq!(expression("1.5"), Expression::float(1.5));
        assert_eq!(expression("2e3"), Expression::float(2000.0));
        assert_eq!(expression("'it''s'"), Expression::string("it's"));
        assert_eq!(expression("TRUE"), Expression::Literal(Literal::Boolean(true)));
        assert_eq!(expression("null"), Expression::Literal(Literal::Null));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(expression("-9223372036854775808"), int(i64::MIN));
        assert_eq!(expression("-2.5"), Expression::float(-2.5));
        assert_eq!(
            expression("-a"),
            Expression::arithmetic(ArithmeticOp::Subtract, int(0), prop("a"))
        );
        assert_eq!(
            expression("-2 * 3"),
            Expression::arithmetic(ArithmeticOp::Multiply, int(-2), int(3))
        );
    }

    #[test]
    fn integer_out_of_range() {
        let err = expression_with("9223372036854775808", default_dialect()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "integer literal `9223372036854775808` is out of range");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn properties() {
        assert_eq!(expression("gml:name"), prop("gml:name"));
        assert_eq!(expression("\"my attr\""), prop("my attr"));
        assert_eq!(expression("a.b.c"), prop("a.b.c"));
        assert_eq!(expression("a.\"b c\""), prop("a.b c"));
    }

    #[test]
    fn functions() {
        assert_eq!(
            expression("strConcat(a, 'b')"),
            Expression::function("strConcat", vec![prop("a"), Expression::string("b")])
        );
        assert_eq!(expression("now()"), Expression::function("now", vec![]));
        assert_eq!(
            expression("abs(x - 1) * 2"),
            Expression::arithmetic(
                ArithmeticOp::Multiply,
                Expression::function(
                    "abs",
                    vec![Expression::arithmetic(ArithmeticOp::Subtract, prop("x"), int(1))],
                ),
                int(2),
            )
        );
    }

    #[test]
    fn function_arity() {
        let err = filter_err("strLength(a, b) = 1");
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "function `strLength` expects 1 argument but 2 were given");
        assert_eq!(err.position().unwrap().column, 1);
    }

    #[test]
    fn predicate_is_not_an_expression() {
        let err = expression_with("a = 1", default_dialect()).unwrap_err();
        assert_eq!(err.message(), "expected an expression but found a predicate");
    }
}

mod filter_tests {
    use super::*;

    #[test]
    fn comparison() {
        assert_eq!(
            filter("NAME = 'abc'"),
            cmp(ComparisonOp::Equal, prop("NAME"), Expression::string("abc"))
        );
        assert_eq!(
            filter("a != 1"),
            cmp(ComparisonOp::NotEqual, prop("a"), int(1))
        );
        assert_eq!(
            filter("a + 1 >= b * 2"),
            cmp(
                ComparisonOp::GreaterOrEqual,
                Expression::arithmetic(ArithmeticOp::Add, prop("a"), int(1)),
                Expression::arithmetic(ArithmeticOp::Multiply, prop("b"), int(2)),
            )
        );
    }

    #[test]
    fn logical_order() {
        assert_eq!(
            filter("A > 1 AND B < 2"),
            Filter::and(vec![
                cmp(ComparisonOp::Greater, prop("A"), int(1)),
                cmp(ComparisonOp::Lesser, prop("B"), int(2)),
            ])
        );

        assert_eq!(
            filter("a = 1 OR b = 2 AND c = 3 OR d = 4"),
            Filter::or(vec![
                cmp(ComparisonOp::Equal, prop("a"), int(1)),
                Filter::and(vec![
                    cmp(ComparisonOp::Equal, prop("b"), int(2)),
                    cmp(ComparisonOp::Equal, prop("c"), int(3)),
                ]),
                cmp(ComparisonOp::Equal, prop("d"), int(4)),
            ])
        );
    }

    #[test]
    fn grouping_is_kept() {
        assert_eq!(
            filter("(a = 1 OR b = 2) AND c = 3"),
            Filter::and(vec![
                Filter::or(vec![
                    cmp(ComparisonOp::Equal, prop("a"), int(1)),
                    cmp(ComparisonOp::Equal, prop("b"), int(2)),
                ]),
                cmp(ComparisonOp::Equal, prop("c"), int(3)),
            ])
        );
    }

    #[test]
    fn negations() {
        let like = |match_case| Filter::Like(Like {
            expression: prop("name"),
            pattern: "ab%".to_string(),
            wildcard: '%',
            single_char: '_',
            escape: '\\',
            match_case,
        });

        assert_eq!(filter("name LIKE 'ab%'"), like(true));
        assert_eq!(filter("name ILIKE 'ab%'"), like(false));
        assert_eq!(filter("name NOT LIKE 'ab%'"), Filter::not(like(true)));
        assert_eq!(filter("NOT name LIKE 'ab%'"), Filter::not(like(true)));
        assert_eq!(
            filter("NOT NOT a IS NULL"),
            Filter::not(Filter::not(Filter::IsNull(prop("a"))))
        );
        assert_eq!(filter("a IS NOT NULL"), Filter::not(Filter::IsNull(prop("a"))));
    }

    #[test]
    fn between_binds_its_and() {
        assert_eq!(
            filter("a BETWEEN 1 AND 2 AND b = 3"),
            Filter::and(vec![
                Filter::Between {
                    expression: prop("a"),
                    lower: int(1),
                    upper: int(2),
                },
                cmp(ComparisonOp::Equal, prop("b"), int(3)),
            ])
        );

        assert_eq!(
            filter("a NOT BETWEEN -1 AND 1"),
            Filter::not(Filter::Between {
                expression: prop("a"),
                lower: int(-1),
                upper: int(1),
            })
        );
    }

    #[test]
    fn in_lists() {
        assert_eq!(
            filter("a IN (1, 'x', b)"),
            Filter::In {
                expression: prop("a"),
                values: vec![int(1), Expression::string("x"), prop("b")],
            }
        );

        assert_eq!(
            filter("IN ('river.1', 2)"),
            Filter::Id(vec!["river.1".to_string(), "2".to_string()])
        );

        let err = filter_err("a IN ()");
        assert_eq!(err.message(), "`IN` requires at least one value");
    }

    #[test]
    fn include_exclude() {
        assert_eq!(filter("INCLUDE"), Filter::Include);
        assert_eq!(
            filter("EXCLUDE OR a = 1"),
            Filter::or(vec![Filter::Exclude, cmp(ComparisonOp::Equal, prop("a"), int(1))])
        );
    }

    #[test]
    fn missing_end_token() {
        let tokens = extract_tokens("a = 1", default_dialect()).unwrap();
        let filter = build_filter(tokens[..tokens.len() - 1].iter(), default_dialect()).unwrap();
        assert_eq!(filter, cmp(ComparisonOp::Equal, prop("a"), int(1)));

        let tokens = extract_tokens("a =", default_dialect()).unwrap();
        let err = build_filter(tokens[..tokens.len() - 1].iter(), default_dialect()).unwrap_err();
        assert_eq!(err.message(), "unexpected end of input, expected an expression");
        assert_eq!(err.position(), None);
    }
}

mod spatial_tests {
    use super::*;
    use crate::lang::geometry::Coordinate;

    fn point(x: f64, y: f64) -> Expression {
        Expression::geometry(Geometry::Point(Some(Coordinate::new(x, y))))
    }

    #[test]
    fn binary() {
        assert_eq!(
            filter("INTERSECTS(geom, POINT(1 2))"),
            Filter::Spatial(SpatialPredicate::Binary {
                op: SpatialOp::Intersects,
                left: prop("geom"),
                right: point(1.0, 2.0),
            })
        );
    }

    #[test]
    fn distance() {
        assert_eq!(
            filter("DWITHIN(geom, POINT(0 0), 10, meters)"),
            Filter::Spatial(SpatialPredicate::Distance {
                op: SpatialOp::DWithin,
                left: prop("geom"),
                right: point(0.0, 0.0),
                distance: 10.0,
                units: "meters".to_string(),
            })
        );
    }

    #[test]
    fn bbox() {
        assert_eq!(
            filter("BBOX(geom, -10, -5, 10, 5.5, 'EPSG:4326')"),
            Filter::Spatial(SpatialPredicate::BBox {
                expression: prop("geom"),
                envelope: Envelope::new(-10.0, -5.0, 10.0, 5.5),
                crs: Some("EPSG:4326".to_string()),
            })
        );
    }

    #[test]
    fn relate() {
        assert_eq!(
            filter("RELATE(a, b, 'T*F**F***')"),
            Filter::Spatial(SpatialPredicate::Relate {
                left: prop("a"),
                right: prop("b"),
                pattern: "T*F**F***".to_string(),
            })
        );
    }

    #[test]
    fn wrong_arity() {
        let err = filter_err("INTERSECTS(geom)");
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "spatial predicate `INTERSECTS` expects 2 arguments but 1 was given");
        assert_eq!(err.position().unwrap().column, 1);

        let err = filter_err("BBOX()");
        assert_eq!(err.message(), "spatial predicate `BBOX` expects 5 or 6 arguments but 0 were given");
    }

    #[test]
    fn inverted_bounds() {
        let err = filter_err("BBOX(geom, 10, 10, 0, 0)");
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "BBOX minimum exceeds its maximum");

        let err = filter_err("INTERSECTS(geom, ENVELOPE(10, 0, 10, 0))");
        assert_eq!(err.message(), "ENVELOPE minimum exceeds its maximum");
    }

    #[test]
    fn disabled_predicate_is_a_function() {
        let dialect = Dialect {
            spatial_predicates: vec![SpatialOp::BBox],
            ..Dialect::default()
        };

        let err = filter_with("within(geom, POINT(1 2))", &dialect).unwrap_err();
        assert_eq!(err.message(), "expected a predicate but found a plain expression");
    }
}

mod geometry_tests {
    use super::*;
    use crate::lang::geometry::Coordinate;

    fn geometry(src: &str) -> Geometry {
        match expression(src) {
            Expression::Literal(Literal::Geometry(geometry)) => geometry,
            other => panic!("not a geometry: {:?}", other),
        }
    }

    fn geometry_err(src: &str) -> CompileError {
        expression_with(src, default_dialect()).unwrap_err()
    }

    #[test]
    fn points() {
        assert_eq!(geometry("POINT(1 -2)"), Geometry::Point(Some(Coordinate::new(1.0, -2.0))));
        assert_eq!(
            geometry("point(1 2 3)"),
            Geometry::Point(Some(Coordinate { x: 1.0, y: 2.0, z: Some(3.0) }))
        );
        assert_eq!(geometry("POINT EMPTY"), Geometry::Point(None));
    }

    #[test]
    fn polygon_with_hole() {
        let polygon = geometry("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))");
        assert_eq!(polygon.geometry_type(), GeometryType::Polygon);
        assert_eq!(polygon.area(), 98.0);
    }

    #[test]
    fn multi_point_forms() {
        assert_eq!(geometry("MULTIPOINT((1 2), (3 4))"), geometry("MULTIPOINT(1 2, 3 4)"));
    }

    #[test]
    fn collection() {
        assert_eq!(
            geometry("GEOMETRYCOLLECTION(POINT(1 2), LINESTRING(0 0, 1 1), POLYGON EMPTY)"),
            Geometry::GeometryCollection(vec![
                Geometry::Point(Some(Coordinate::new(1.0, 2.0))),
                Geometry::LineString(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)]),
                Geometry::Polygon(vec![]),
            ])
        );
    }

    #[test]
    fn envelope_order() {
        assert_eq!(
            geometry("ENVELOPE(0, 10, 20, 5)"),
            Geometry::Envelope(Envelope::new(0.0, 5.0, 10.0, 20.0))
        );
    }

    #[test]
    fn invalid_geometries() {
        assert_eq!(geometry_err("ENVELOPE EMPTY").message(), "ENVELOPE cannot be EMPTY");
        assert_eq!(geometry_err("LINESTRING(1 2)").message(), "LINESTRING requires at least 2 points");
        assert_eq!(
            geometry_err("POLYGON((0 0, 1 0, 1 1, 0 1))").message(),
            "POLYGON ring is not closed"
        );
        assert_eq!(
            geometry_err("POINT(1)").message(),
            "unexpected token `)`, expected a coordinate"
        );
        assert_eq!(
            geometry_err("MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0))").message(),
            "unclosed parenthesis, expected `)` before end of input"
        );
    }
}

mod error_tests {
    use super::*;
    use crate::lang::error::{validate_message, Position};

    #[test]
    fn missing_operand() {
        let err = filter_err("A = ");
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.message(), "unexpected end of input, expected an expression");
        assert_eq!(err.position(), Some(Position { line: 1, column: 5, offset: 4 }));
    }

    #[test]
    fn unclosed_parenthesis() {
        let err = filter_err("A = (B");
        assert_eq!(err.message(), "unclosed parenthesis, expected `)` before end of input");
        assert_eq!(err.position(), Some(Position { line: 1, column: 5, offset: 4 }));
    }

    #[test]
    fn trailing_input() {
        let err = filter_err("a = 1 b");
        assert_eq!(err.message(), "unexpected trailing input: identifier `b`");
        assert_eq!(err.position().unwrap().column, 7);

        let err = filter_err("a = 1)");
        assert_eq!(err.message(), "unexpected trailing input: token `)`");
        assert_eq!(err.to_string(), "unexpected trailing input: token `)` at line 1, column 6");
    }

    #[test]
    fn chained_comparison() {
        let err = filter_err("a = 1 = 2");
        assert_eq!(err.message(), "unexpected token `=`, comparisons cannot be chained");
        assert_eq!(err.position().unwrap().column, 7);
    }

    #[test]
    fn expression_is_not_a_filter() {
        let err = filter_err("a + 1");
        assert_eq!(err.message(), "expected a predicate but found a plain expression");

        let err = filter_err("(a = 1) + 1 = 2");
        assert_eq!(err.message(), "expected an expression but found a predicate");
    }

    #[test]
    fn nesting_limit() {
        let dialect = Dialect {
            max_depth: 3,
            ..Dialect::default()
        };

        assert!(filter_with("((a = 1))", &dialect).is_ok());

        for src in ["(((a = 1)))", "NOT NOT NOT a = 1", "f(f(f(1))) = 1"].iter() {
            let err = filter_with(src, &dialect).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Semantic, "input {:?}", src);
            assert_eq!(err.message(), "nesting exceeds the maximum depth of 3");
        }

        assert!(filter_with("1 + 1 + 1 = a", &dialect).is_ok());
        let err = filter_with("1 + 1 + 1 + 1 = a", &dialect).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "arithmetic chain exceeds the maximum depth of 3");

        let err = expression_with("- - - - 1", &dialect).unwrap_err();
        assert_eq!(err.message(), "nesting exceeds the maximum depth of 3");
    }

    #[test]
    fn messages_are_valid() {
        let inputs = [
            "", "(", ")", "a", "a =", "a = (b", "a = 1 AND", "a LIKE 1", "a NOT = 1",
            "a BETWEEN 1", "a IS 1", "IN (a)", "BBOX(a, 1, 2, 3, x)", "DWITHIN(a, b, 1, 2)",
            "RELATE(a, b, 'xyz')", "f(1,", "a.1 = 2", "x = POINT(1 2", "'{}' = a b",
        ];

        for src in inputs.iter() {
            let err = filter_err(src);
            assert_ne!(err.kind(), ErrorKind::Internal, "input {:?}", src);
            assert!(validate_message(err.message()).is_ok(), "input {:?}", src);
        }
    }
}
