use std::collections::HashSet;
use std::fmt;

use graphql_parser::schema::{Definition, Document, Type, TypeDefinition, parse_schema};
use tracing::debug;

use crate::error::GatewayError;

/// The SDL served by the gateway.
pub const GATEWAY_SDL: &str = include_str!(concat!(env!("OUT_SCHEMAS"), "/gateway.graphql"));

const BUILTIN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];

/// `Type.field`, the key every resolver binding is stored under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldCoordinate {
    pub type_name: String,
    pub field_name: String,
}

impl FieldCoordinate {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        FieldCoordinate {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FieldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// A field or argument type, keeping list wrapping and nullability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Named(String),
    List(Box<FieldType>),
    NonNull(Box<FieldType>),
}

impl FieldType {
    /// The innermost type name, with list and non-null wrappers removed.
    pub fn named_type(&self) -> &str {
        match self {
            FieldType::Named(name) => name,
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }

    fn from_parsed(ty: &Type<'_, String>) -> Self {
        match ty {
            Type::NamedType(name) => FieldType::Named(name.clone()),
            Type::ListType(inner) => FieldType::List(Box::new(FieldType::from_parsed(inner))),
            Type::NonNullType(inner) => {
                FieldType::NonNull(Box::new(FieldType::from_parsed(inner)))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Named(name) => write!(f, "{name}"),
            FieldType::List(inner) => write!(f, "[{inner}]"),
            FieldType::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentContract {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldContract {
    pub name: String,
    pub ty: FieldType,
    pub arguments: Vec<ArgumentContract>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectContract {
    pub name: String,
    pub fields: Vec<FieldContract>,
}

impl ObjectContract {
    pub fn field(&self, name: &str) -> Option<&FieldContract> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// The declared API surface: object types, their fields, argument shapes
/// and nullability. Holds no resolution logic.
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    query_type: String,
    mutation_type: Option<String>,
    objects: Vec<ObjectContract>,
}

impl SchemaRegistry {
    /// Registry for the SDL embedded at build time.
    pub fn builtin() -> Result<Self, GatewayError> {
        Self::from_sdl(GATEWAY_SDL)
    }

    pub fn from_sdl(sdl: &str) -> Result<Self, GatewayError> {
        let document = parse_schema::<String>(sdl).map_err(|e| GatewayError::InvalidSchema {
            message: format!("failed to parse schema: {e}"),
        })?;

        let registry = Self::from_document(&document)?;
        registry.validate()?;
        debug!(
            objects = registry.objects.len(),
            query = %registry.query_type,
            "schema registry loaded"
        );
        Ok(registry)
    }

    fn from_document(document: &Document<'_, String>) -> Result<Self, GatewayError> {
        let mut query_type = None;
        let mut mutation_type = None;
        let mut objects = Vec::new();

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema) => {
                    if schema.subscription.is_some() {
                        return Err(GatewayError::InvalidSchema {
                            message: "subscriptions are not supported".to_string(),
                        });
                    }
                    query_type = schema.query.clone();
                    mutation_type = schema.mutation.clone();
                }
                Definition::TypeDefinition(TypeDefinition::Object(object)) => {
                    let fields = object
                        .fields
                        .iter()
                        .map(|field| FieldContract {
                            name: field.name.clone(),
                            ty: FieldType::from_parsed(&field.field_type),
                            arguments: field
                                .arguments
                                .iter()
                                .map(|argument| ArgumentContract {
                                    name: argument.name.clone(),
                                    ty: FieldType::from_parsed(&argument.value_type),
                                })
                                .collect(),
                        })
                        .collect();
                    objects.push(ObjectContract {
                        name: object.name.clone(),
                        fields,
                    });
                }
                Definition::TypeDefinition(other) => {
                    return Err(GatewayError::InvalidSchema {
                        message: format!("unsupported type definition {}", type_name(other)),
                    });
                }
                Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => {
                    return Err(GatewayError::InvalidSchema {
                        message: "type extensions and directive definitions are not supported"
                            .to_string(),
                    });
                }
            }
        }

        let mutation_type = mutation_type.or_else(|| {
            objects
                .iter()
                .any(|object| object.name == "Mutation")
                .then(|| "Mutation".to_string())
        });

        Ok(SchemaRegistry {
            query_type: query_type.unwrap_or_else(|| "Query".to_string()),
            mutation_type,
            objects,
        })
    }

    fn validate(&self) -> Result<(), GatewayError> {
        let mut seen = HashSet::new();
        for object in &self.objects {
            if !seen.insert(object.name.as_str()) {
                return Err(GatewayError::InvalidSchema {
                    message: format!("type {} is declared twice", object.name),
                });
            }
        }

        for root in std::iter::once(&self.query_type).chain(self.mutation_type.as_ref()) {
            if self.object(root).is_none() {
                return Err(GatewayError::InvalidSchema {
                    message: format!("root type {root} is not declared"),
                });
            }
        }

        for object in &self.objects {
            let mut field_names = HashSet::new();
            for field in &object.fields {
                let coordinate = FieldCoordinate::new(&object.name, &field.name);
                if !field_names.insert(field.name.as_str()) {
                    return Err(GatewayError::SchemaConflict {
                        coordinate: coordinate.to_string(),
                    });
                }
                self.require_known_type(&coordinate, &field.ty)?;
                for argument in &field.arguments {
                    if !BUILTIN_SCALARS.contains(&argument.ty.named_type()) {
                        return Err(GatewayError::InvalidSchema {
                            message: format!(
                                "argument {coordinate}({}) must be a scalar, found {}",
                                argument.name, argument.ty
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn require_known_type(
        &self,
        coordinate: &FieldCoordinate,
        ty: &FieldType,
    ) -> Result<(), GatewayError> {
        let name = ty.named_type();
        if BUILTIN_SCALARS.contains(&name) || self.object(name).is_some() {
            Ok(())
        } else {
            Err(GatewayError::InvalidSchema {
                message: format!("{coordinate} refers to unknown type {name}"),
            })
        }
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    /// Root operation types must have every field bound explicitly.
    pub fn is_root(&self, type_name: &str) -> bool {
        type_name == self.query_type || self.mutation_type.as_deref() == Some(type_name)
    }

    pub fn objects(&self) -> &[ObjectContract] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&ObjectContract> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn field(&self, coordinate: &FieldCoordinate) -> Option<&FieldContract> {
        self.object(&coordinate.type_name)
            .and_then(|object| object.field(&coordinate.field_name))
    }
}

fn type_name<'a, 'b>(definition: &'a TypeDefinition<'b, String>) -> &'a str {
    match definition {
        TypeDefinition::Scalar(scalar) => &scalar.name,
        TypeDefinition::Object(object) => &object.name,
        TypeDefinition::Interface(interface) => &interface.name,
        TypeDefinition::Union(union_type) => &union_type.name,
        TypeDefinition::Enum(enum_type) => &enum_type.name,
        TypeDefinition::InputObject(input) => &input.name,
    }
}
