//! Named geometry processes.
//!
//! A [`ProcessRegistry`] is an ordinary value: create one with
//! [`ProcessRegistry::with_builtins`], extend it with [`register`] and hand
//! it to whoever needs lookups. There is no process-wide instance.
//!
//! [`register`]: ProcessRegistry::register

use crate::lang::filter::Literal;
use crate::lang::geometry::Geometry;

use std::collections::BTreeMap;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ProcessError {
    #[error("process `{0}` is already registered with a different factory")]
    Conflict(String),

    #[error("unknown process `{0}`")]
    Unknown(String),

    #[error("process `{process}` expects {expected} inputs but {given} were given")]
    Arity {
        process: &'static str,
        expected: usize,
        given: usize,
    },

    #[error("process `{process}` cannot take {found} as input {index}")]
    InvalidInput {
        process: &'static str,
        index: usize,
        found: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub inputs: &'static [&'static str],
    pub output: &'static str,
}

pub trait Process: Send + Sync {
    fn descriptor(&self) -> ProcessDescriptor;
    fn execute(&self, inputs: &[Literal]) -> Result<Literal, ProcessError>;
}

pub type ProcessFactory = fn() -> Box<dyn Process>;

const BUILTINS: [(&str, ProcessFactory); 3] = [
    (Bounds::NAME, Bounds::create),
    (Area::NAME, Area::create),
    (Length::NAME, Length::create),
];

#[derive(Clone, Debug, Default)]
pub struct ProcessRegistry {
    factories: BTreeMap<String, ProcessFactory>,
}

impl ProcessRegistry {
    /// An empty registry.
    pub fn new() -> ProcessRegistry {
        ProcessRegistry::default()
    }

    pub fn with_builtins() -> ProcessRegistry {
        let mut registry = ProcessRegistry::new();
        registry.reset();
        registry
    }

    /// Adds a factory under `name`. Registering a factory that describes the
    /// same process again is a no-op; any other factory under a taken name is
    /// rejected.
    pub fn register(&mut self, name: impl Into<String>, factory: ProcessFactory) -> Result<(), ProcessError> {
        let name = name.into();

        match self.factories.get(&name) {
            Some(existing) if existing().descriptor() == factory().descriptor() => Ok(()),
            Some(_) => Err(ProcessError::Conflict(name)),
            None => {
                log::debug!("registering process {}", name);
                self.factories.insert(name, factory);
                Ok(())
            },
        }
    }

    /// Instantiates the process registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<Box<dyn Process>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> Vec<ProcessDescriptor> {
        self.factories.values().map(|factory| factory().descriptor()).collect()
    }

    pub fn execute(&self, name: &str, inputs: &[Literal]) -> Result<Literal, ProcessError> {
        let process = self
            .lookup(name)
            .ok_or_else(|| ProcessError::Unknown(name.to_string()))?;

        process.execute(inputs)
    }

    /// Drops every registration and restores the builtin set.
    pub fn reset(&mut self) {
        self.factories = BUILTINS
            .iter()
            .map(|(name, factory)| (name.to_string(), *factory))
            .collect();
    }
}

fn literal_kind(literal: &Literal) -> &'static str {
    match literal {
        Literal::Integer(_) => "an integer",
        Literal::Float(_) => "a float",
        Literal::String(_) => "a string",
        Literal::Boolean(_) => "a boolean",
        Literal::Null => "null",
        Literal::Geometry(_) => "a geometry",
    }
}

fn single_geometry<'a>(process: &'static str, inputs: &'a [Literal]) -> Result<&'a Geometry, ProcessError> {
    match inputs {
        [Literal::Geometry(geometry)] => Ok(geometry),
        [other] => Err(ProcessError::InvalidInput {
            process,
            index: 1,
            found: literal_kind(other),
        }),
        _ => Err(ProcessError::Arity {
            process,
            expected: 1,
            given: inputs.len(),
        }),
    }
}

struct Bounds;

impl Bounds {
    const NAME: &'static str = "geo:bounds";

    fn create() -> Box<dyn Process> {
        Box::new(Bounds)
    }
}

impl Process for Bounds {
    fn descriptor(&self) -> ProcessDescriptor {
        ProcessDescriptor {
            name: Bounds::NAME,
            title: "Bounding envelope of a geometry",
            inputs: &["geometry"],
            output: "envelope",
        }
    }

    fn execute(&self, inputs: &[Literal]) -> Result<Literal, ProcessError> {
        let geometry = single_geometry(Bounds::NAME, inputs)?;

        Ok(match geometry.bounds() {
            Some(envelope) => Literal::Geometry(Geometry::Envelope(envelope)),
            None => Literal::Null,
        })
    }
}

struct Area;

impl Area {
    const NAME: &'static str = "geo:area";

    fn create() -> Box<dyn Process> {
        Box::new(Area)
    }
}

impl Process for Area {
    fn descriptor(&self) -> ProcessDescriptor {
        ProcessDescriptor {
            name: Area::NAME,
            title: "Planar area of a geometry",
            inputs: &["geometry"],
            output: "float",
        }
    }

    fn execute(&self, inputs: &[Literal]) -> Result<Literal, ProcessError> {
        let geometry = single_geometry(Area::NAME, inputs)?;
        Ok(Literal::Float(geometry.area()))
    }
}

struct Length;

impl Length {
    const NAME: &'static str = "geo:length";

    fn create() -> Box<dyn Process> {
        Box::new(Length)
    }
}

impl Process for Length {
    fn descriptor(&self) -> ProcessDescriptor {
        ProcessDescriptor {
            name: Length::NAME,
            title: "Planar length or perimeter of a geometry",
            inputs: &["geometry"],
            output: "float",
        }
    }

    fn execute(&self, inputs: &[Literal]) -> Result<Literal, ProcessError> {
        let geometry = single_geometry(Length::NAME, inputs)?;
        Ok(Literal::Float(geometry.length()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::filter::Expression;
    use crate::lang::geometry::Envelope;

    struct Echo;

    impl Process for Echo {
        fn descriptor(&self) -> ProcessDescriptor {
            ProcessDescriptor {
                name: "test:echo",
                title: "Returns its input",
                inputs: &["value"],
                output: "value",
            }
        }

        fn execute(&self, inputs: &[Literal]) -> Result<Literal, ProcessError> {
            Ok(inputs.first().cloned().unwrap_or(Literal::Null))
        }
    }

    fn echo() -> Box<dyn Process> {
        Box::new(Echo)
    }

    fn echo_again() -> Box<dyn Process> {
        Box::new(Echo)
    }

    fn geometry_literal(src: &str) -> Literal {
        match crate::parse_expression(src).unwrap() {
            Expression::Literal(literal) => literal,
            other => panic!("not a literal: {:?}", other),
        }
    }

    #[test]
    fn builtins() {
        let registry = ProcessRegistry::with_builtins();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["geo:area", "geo:bounds", "geo:length"]
        );

        let square = geometry_literal("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))");
        assert_eq!(registry.execute("geo:area", &[square.clone()]), Ok(Literal::Float(16.0)));
        assert_eq!(registry.execute("geo:length", &[square.clone()]), Ok(Literal::Float(16.0)));
        assert_eq!(
            registry.execute("geo:bounds", &[square]),
            Ok(Literal::Geometry(Geometry::Envelope(Envelope::new(0.0, 0.0, 4.0, 4.0))))
        );

        let empty = geometry_literal("POINT EMPTY");
        assert_eq!(registry.execute("geo:bounds", &[empty]), Ok(Literal::Null));
    }

    #[test]
    fn invalid_inputs() {
        let registry = ProcessRegistry::with_builtins();

        assert_eq!(
            registry.execute("geo:area", &[Literal::Integer(1)]),
            Err(ProcessError::InvalidInput {
                process: "geo:area",
                index: 1,
                found: "an integer",
            })
        );
        assert_eq!(
            registry.execute("geo:area", &[]),
            Err(ProcessError::Arity {
                process: "geo:area",
                expected: 1,
                given: 0,
            })
        );
        assert_eq!(
            registry.execute("geo:nothing", &[]),
            Err(ProcessError::Unknown("geo:nothing".to_string()))
        );
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ProcessRegistry::with_builtins();

        registry.register("test:echo", echo).unwrap();
        registry.register("test:echo", echo).unwrap();
        registry.register("test:echo", echo_again).unwrap();
        assert_eq!(
            registry.register("geo:area", echo),
            Err(ProcessError::Conflict("geo:area".to_string()))
        );

        let process = registry.lookup("test:echo").unwrap();
        assert_eq!(process.descriptor().name, "test:echo");
        assert_eq!(process.execute(&[Literal::Boolean(true)]), Ok(Literal::Boolean(true)));
        assert!(registry.lookup("test:missing").is_none());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut registry = ProcessRegistry::with_builtins();
        registry.register("test:echo", echo).unwrap();

        registry.reset();
        let once: Vec<String> = registry.names().map(String::from).collect();
        registry.reset();
        let twice: Vec<String> = registry.names().map(String::from).collect();

        assert_eq!(once, twice);
        assert!(!registry.contains("test:echo"));
        assert_eq!(registry.descriptors().len(), 3);
    }
}
