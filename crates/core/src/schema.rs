use std::collections::HashMap;
use std::fmt;

use gsp_protocol::Value;

use crate::codec::{Arg, Args};
use crate::error::ProtocolError;
use crate::object::{self, ManagedObject as _, ObjectHandle};

/// Declared category of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    /// Integer only (offsets, counts).
    Int,
    /// Integer or float.
    Number,
    Str,
    /// Opaque binary payload.
    Bytes,
    List,
    Map,
    /// Reference to a managed object of the named type.
    Ref(&'static str),
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Bool => f.write_str("bool"),
            ParamKind::Int => f.write_str("int"),
            ParamKind::Number => f.write_str("number"),
            ParamKind::Str => f.write_str("str"),
            ParamKind::Bytes => f.write_str("bytes"),
            ParamKind::List => f.write_str("list"),
            ParamKind::Map => f.write_str("map"),
            ParamKind::Ref(type_name) => write!(f, "ref to {type_name}"),
        }
    }
}

impl ParamKind {
    /// Whether a runtime argument is a member of this category.
    pub fn accepts(&self, arg: &Arg) -> bool {
        match (self, arg) {
            (ParamKind::Ref(type_name), Arg::Object(handle)) => {
                object::lock(handle).type_name() == *type_name
            }
            (_, Arg::Object(_)) => false,
            (kind, Arg::Value(value)) => kind.accepts_value(value),
        }
    }

    /// Whether a wire value is a member of this category. References
    /// can only be checked for shape here; the referee's type is the
    /// linter's concern.
    pub fn accepts_value(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamKind::Bool, Value::Bool(_)) => true,
            (ParamKind::Int, Value::Int(_)) => true,
            (ParamKind::Number, Value::Int(_) | Value::Float(_)) => true,
            (ParamKind::Str, Value::Str(_)) => true,
            (ParamKind::Bytes, Value::Bytes(_)) => true,
            (ParamKind::List, Value::List(_)) => true,
            (ParamKind::Map, Value::Map(_)) => true,
            (ParamKind::Ref(_), Value::Ref(_)) => true,
            _ => false,
        }
    }
}

/// One declared parameter: its name and allowed-type set.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kinds: Vec<ParamKind>,
}

impl ParamSpec {
    pub fn new(name: &'static str, kinds: Vec<ParamKind>) -> Self {
        Self { name, kinds }
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::Bool])
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::Int])
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::Number])
    }

    pub fn str(name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::Str])
    }

    pub fn bytes(name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::Bytes])
    }

    pub fn list(name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::List])
    }

    pub fn reference(name: &'static str, type_name: &'static str) -> Self {
        Self::new(name, vec![ParamKind::Ref(type_name)])
    }

    fn expected(&self) -> String {
        let names: Vec<String> = self.kinds.iter().map(ParamKind::to_string).collect();
        names.join(" | ")
    }
}

/// Constructor handler: builds a fresh instance from resolved
/// arguments. The caller stamps the oid and registers the handle.
pub type BuildFn = Box<dyn Fn(&Args) -> Result<ObjectHandle, ProtocolError> + Send + Sync>;

/// Mutation handler: applies an operation to an existing instance.
pub type ApplyFn =
    Box<dyn Fn(&mut dyn object::ManagedObject, &Args) -> Result<(), ProtocolError> + Send + Sync>;

/// One named mutator of a constructible type.
pub struct OperationSchema {
    name: &'static str,
    params: Vec<ParamSpec>,
    apply: ApplyFn,
}

impl OperationSchema {
    pub fn new<F>(name: &'static str, params: Vec<ParamSpec>, apply: F) -> Self
    where
        F: Fn(&mut dyn object::ManagedObject, &Args) -> Result<(), ProtocolError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            params,
            apply: Box::new(apply),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn apply(
        &self,
        receiver: &mut dyn object::ManagedObject,
        args: &Args,
    ) -> Result<(), ProtocolError> {
        (self.apply)(receiver, args)
    }
}

impl fmt::Debug for OperationSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSchema")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A constructible type: its constructor parameters and handler plus
/// its operation table.
pub struct TypeSchema {
    name: &'static str,
    params: Vec<ParamSpec>,
    build: BuildFn,
    operations: HashMap<&'static str, OperationSchema>,
}

impl TypeSchema {
    pub fn new<F>(name: &'static str, params: Vec<ParamSpec>, build: F) -> Self
    where
        F: Fn(&Args) -> Result<ObjectHandle, ProtocolError> + Send + Sync + 'static,
    {
        Self {
            name,
            params,
            build: Box::new(build),
            operations: HashMap::new(),
        }
    }

    pub fn with_operation(mut self, operation: OperationSchema) -> Self {
        self.operations.insert(operation.name, operation);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn build(&self, args: &Args) -> Result<ObjectHandle, ProtocolError> {
        (self.build)(args)
    }

    pub fn operation(&self, name: &str) -> Result<&OperationSchema, ProtocolError> {
        self.operations
            .get(name)
            .ok_or_else(|| ProtocolError::UnknownOperation {
                type_name: self.name.to_string(),
                operation: name.to_string(),
            })
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationSchema> {
        self.operations.values()
    }
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Closed dispatch table `type name -> schema`, populated by schema
/// providers at startup. The engine never special-cases a concrete
/// type; everything it knows about an envelope's target comes from
/// here.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<&'static str, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: TypeSchema) -> Result<(), ProtocolError> {
        if self.types.contains_key(schema.name) {
            return Err(ProtocolError::DuplicateType(schema.name.to_string()));
        }
        self.types.insert(schema.name, schema);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Result<&TypeSchema, ProtocolError> {
        self.types
            .get(type_name)
            .ok_or_else(|| ProtocolError::UnknownType(type_name.to_string()))
    }

    pub fn operation(
        &self,
        type_name: &str,
        operation: &str,
    ) -> Result<(&TypeSchema, &OperationSchema), ProtocolError> {
        let schema = self.get(type_name)?;
        Ok((schema, schema.operation(operation)?))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}

/// Check every supplied argument against the declared parameter set:
/// each declared parameter must be present and within its allowed-type
/// set, and nothing undeclared may be supplied. Runs before the wrapped
/// operation, so a rejected call never mutates state.
pub fn validate(params: &[ParamSpec], args: &Args) -> Result<(), ProtocolError> {
    for spec in params {
        let arg = args
            .get(spec.name)
            .ok_or_else(|| ProtocolError::MissingParameter(spec.name.to_string()))?;
        if !spec.kinds.iter().any(|kind| kind.accepts(arg)) {
            return Err(ProtocolError::TypeMismatch {
                parameter: spec.name.to_string(),
                expected: spec.expected(),
                actual: arg.kind_name(),
            });
        }
    }
    for (name, _) in args.iter() {
        if !params.iter().any(|spec| spec.name == name) {
            return Err(ProtocolError::UndeclaredParameter(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_accepts_int_and_float() {
        let spec = ParamSpec::number("width");
        assert!(spec.kinds[0].accepts(&Arg::Value(Value::Int(3))));
        assert!(spec.kinds[0].accepts(&Arg::Value(Value::Float(3.5))));
        assert!(!spec.kinds[0].accepts(&Arg::Value(Value::Str("3".into()))));
    }

    #[test]
    fn validate_flags_missing_and_undeclared() {
        let params = vec![ParamSpec::number("width")];

        let err = validate(&params, &Args::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingParameter(name) if name == "width"));

        let args = Args::new().with("width", 1.0).with("depth", 2.0);
        let err = validate(&params, &args).unwrap_err();
        assert!(matches!(err, ProtocolError::UndeclaredParameter(name) if name == "depth"));
    }

    #[test]
    fn validate_reports_expected_set() {
        let params = vec![ParamSpec::new(
            "size",
            vec![ParamKind::Int, ParamKind::List],
        )];
        let args = Args::new().with("size", "big");
        let err = validate(&params, &args).unwrap_err();
        match err {
            ProtocolError::TypeMismatch {
                parameter,
                expected,
                actual,
            } => {
                assert_eq!(parameter, "size");
                assert_eq!(expected, "int | list");
                assert_eq!(actual, "str");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_type_registration_fails() {
        let mut schemas = SchemaRegistry::new();
        schemas
            .register(TypeSchema::new("Dot", vec![], |_| {
                Err(ProtocolError::UnknownType("Dot".into()))
            }))
            .unwrap();
        let err = schemas
            .register(TypeSchema::new("Dot", vec![], |_| {
                Err(ProtocolError::UnknownType("Dot".into()))
            }))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::DuplicateType(name) if name == "Dot"));
    }

    #[test]
    fn unknown_lookups() {
        let schemas = SchemaRegistry::new();
        assert!(matches!(
            schemas.get("Ghost").unwrap_err(),
            ProtocolError::UnknownType(name) if name == "Ghost"
        ));
    }
}
