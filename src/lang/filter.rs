use super::geometry::{Envelope, Geometry};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Geometry(Geometry),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(num) => Some(*num as f64),
            Literal::Float(num) => Some(*num),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            ArithmeticOp::Add | ArithmeticOp::Subtract => 1,
            ArithmeticOp::Multiply | ArithmeticOp::Divide => 2,
        }
    }
}

/// A value-valued computation tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Expression {
    Literal(Literal),
    /// Attribute reference, kept as an opaque key.
    Property(String),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Function {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn property(name: impl Into<String>) -> Expression {
        Expression::Property(name.into())
    }

    pub fn integer(num: i64) -> Expression {
        Expression::Literal(Literal::Integer(num))
    }

    pub fn float(num: f64) -> Expression {
        Expression::Literal(Literal::Float(num))
    }

    pub fn string(s: impl Into<String>) -> Expression {
        Expression::Literal(Literal::String(s.into()))
    }

    pub fn geometry(geometry: Geometry) -> Expression {
        Expression::Literal(Literal::Geometry(geometry))
    }

    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Expression {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(literal) => Some(literal),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Lesser,
    LesserOrEqual,
    Greater,
    GreaterOrEqual,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::Lesser => "<",
            ComparisonOp::LesserOrEqual => "<=",
            ComparisonOp::Greater => ">",
            ComparisonOp::GreaterOrEqual => ">=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// AND/OR over at least two operands, kept in source order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Logical {
    op: LogicalOp,
    operands: Vec<Filter>,
}

impl Logical {
    pub fn op(&self) -> LogicalOp {
        self.op
    }

    pub fn operands(&self) -> &[Filter] {
        &self.operands
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Like {
    pub expression: Expression,
    pub pattern: String,
    pub wildcard: char,
    pub single_char: char,
    pub escape: char,
    pub match_case: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpatialOp {
    Intersects,
    Disjoint,
    Contains,
    Within,
    Touches,
    Crosses,
    Overlaps,
    Equals,
    DWithin,
    Beyond,
    BBox,
    Relate,
}

impl SpatialOp {
    pub const ALL: [SpatialOp; 12] = [
        SpatialOp::Intersects,
        SpatialOp::Disjoint,
        SpatialOp::Contains,
        SpatialOp::Within,
        SpatialOp::Touches,
        SpatialOp::Crosses,
        SpatialOp::Overlaps,
        SpatialOp::Equals,
        SpatialOp::DWithin,
        SpatialOp::Beyond,
        SpatialOp::BBox,
        SpatialOp::Relate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpatialOp::Intersects => "INTERSECTS",
            SpatialOp::Disjoint => "DISJOINT",
            SpatialOp::Contains => "CONTAINS",
            SpatialOp::Within => "WITHIN",
            SpatialOp::Touches => "TOUCHES",
            SpatialOp::Crosses => "CROSSES",
            SpatialOp::Overlaps => "OVERLAPS",
            SpatialOp::Equals => "EQUALS",
            SpatialOp::DWithin => "DWITHIN",
            SpatialOp::Beyond => "BEYOND",
            SpatialOp::BBox => "BBOX",
            SpatialOp::Relate => "RELATE",
        }
    }

    pub fn from_name(name: &str) -> Option<SpatialOp> {
        SpatialOp::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SpatialPredicate {
    /// INTERSECTS, DISJOINT, CONTAINS, WITHIN, TOUCHES, CROSSES, OVERLAPS, EQUALS
    Binary {
        op: SpatialOp,
        left: Expression,
        right: Expression,
    },
    /// DWITHIN, BEYOND
    Distance {
        op: SpatialOp,
        left: Expression,
        right: Expression,
        distance: f64,
        units: String,
    },
    BBox {
        expression: Expression,
        envelope: Envelope,
        crs: Option<String>,
    },
    Relate {
        left: Expression,
        right: Expression,
        pattern: String,
    },
}

impl SpatialPredicate {
    pub fn op(&self) -> SpatialOp {
        match self {
            SpatialPredicate::Binary { op, .. } | SpatialPredicate::Distance { op, .. } => *op,
            SpatialPredicate::BBox { .. } => SpatialOp::BBox,
            SpatialPredicate::Relate { .. } => SpatialOp::Relate,
        }
    }
}

/// A boolean-valued predicate tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Filter {
    Include,
    Exclude,
    Comparison {
        op: ComparisonOp,
        left: Expression,
        right: Expression,
    },
    Like(Like),
    Between {
        expression: Expression,
        lower: Expression,
        upper: Expression,
    },
    IsNull(Expression),
    In {
        expression: Expression,
        values: Vec<Expression>,
    },
    /// Feature identifiers, `IN ('river.1', 'river.2')`.
    Id(Vec<String>),
    Spatial(SpatialPredicate),
    Logical(Logical),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(op: ComparisonOp, left: Expression, right: Expression) -> Filter {
        Filter::Comparison { op, left, right }
    }

    pub fn and(operands: Vec<Filter>) -> Filter {
        Filter::logical(LogicalOp::And, operands)
    }

    pub fn or(operands: Vec<Filter>) -> Filter {
        Filter::logical(LogicalOp::Or, operands)
    }

    /// Builds an AND/OR node. An empty list is the operator's identity
    /// (`INCLUDE` for AND, `EXCLUDE` for OR) and a single operand is
    /// returned as is.
    pub fn logical(op: LogicalOp, mut operands: Vec<Filter>) -> Filter {
        match operands.len() {
            0 => match op {
                LogicalOp::And => Filter::Include,
                LogicalOp::Or => Filter::Exclude,
            },
            1 => operands.remove(0),
            _ => Filter::Logical(Logical { op, operands }),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Filter {
        Filter::Not(Box::new(filter))
    }
}
