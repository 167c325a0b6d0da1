//! Entity service calls and their argument schemas.

use serde_json::{Map, Value};

use crate::entity::EntityId;
use crate::error::{HubError, Result};

/// Shape an argument value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A non-empty entity id string.
    EntityId,
    /// Any string.
    Str,
    /// A boolean.
    Bool,
    /// An integer greater than zero.
    PositiveInt,
    /// A float in `0.0..=1.0`.
    Fraction,
}

impl ArgKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ArgKind::EntityId => value.as_str().is_some_and(|s| !s.is_empty()),
            ArgKind::Str => value.is_string(),
            ArgKind::Bool => value.is_boolean(),
            ArgKind::PositiveInt => value.as_u64().is_some_and(|n| n > 0),
            ArgKind::Fraction => value.as_f64().is_some_and(|f| (0.0..=1.0).contains(&f)),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ArgKind::EntityId => "an entity id",
            ArgKind::Str => "a string",
            ArgKind::Bool => "a boolean",
            ArgKind::PositiveInt => "a positive integer",
            ArgKind::Fraction => "a fraction between 0.0 and 1.0",
        }
    }
}

/// One declared argument of a service.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

/// Declared argument set of a service, validated before dispatch.
///
/// Validation rejects missing required arguments, values of the wrong
/// shape and arguments the service never declared. Handlers can then
/// read their arguments without re-checking presence or type.
#[derive(Debug, Clone, Default)]
pub struct ServiceSchema {
    args: Vec<ArgSpec>,
}

impl ServiceSchema {
    /// Schema with no arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required argument.
    pub fn with_required(mut self, name: &'static str, kind: ArgKind) -> Self {
        self.args.push(ArgSpec {
            name,
            kind,
            required: true,
        });
        self
    }

    /// Add an optional argument.
    pub fn with_optional(mut self, name: &'static str, kind: ArgKind) -> Self {
        self.args.push(ArgSpec {
            name,
            kind,
            required: false,
        });
        self
    }

    /// Declared arguments.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Check a call's arguments against this schema.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<()> {
        for spec in &self.args {
            match args.get(spec.name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(HubError::InvalidArgument(format!(
                            "{} must be {}",
                            spec.name,
                            spec.kind.describe()
                        )));
                    }
                }
                None if spec.required => {
                    return Err(HubError::MissingArgument(spec.name.to_string()));
                }
                None => {}
            }
        }
        for key in args.keys() {
            if !self.args.iter().any(|spec| spec.name == key) {
                return Err(HubError::InvalidArgument(format!("unknown argument: {key}")));
            }
        }
        Ok(())
    }
}

/// A request to run a named service against one entity.
#[derive(Debug, Clone)]
pub struct ServiceCall {
    /// Service name, unique within a platform.
    pub service: String,
    /// Entity the call targets.
    pub target: EntityId,
    /// Validated arguments.
    pub args: Map<String, Value>,
}

impl ServiceCall {
    /// Build a call with no arguments.
    pub fn new(service: impl Into<String>, target: impl Into<EntityId>) -> Self {
        Self {
            service: service.into(),
            target: target.into(),
            args: Map::new(),
        }
    }

    /// Attach one argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Raw argument value, if present.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// String argument, already validated by the schema.
    pub fn str_arg(&self, name: &str) -> Result<&str> {
        self.arg(name)
            .and_then(Value::as_str)
            .ok_or_else(|| HubError::MissingArgument(name.to_string()))
    }

    /// Unsigned integer argument, already validated by the schema.
    pub fn u64_arg(&self, name: &str) -> Result<u64> {
        self.arg(name)
            .and_then(Value::as_u64)
            .ok_or_else(|| HubError::MissingArgument(name.to_string()))
    }
}
