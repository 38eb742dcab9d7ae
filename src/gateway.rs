use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, Schema, TypeRef,
};
use async_graphql::{Value as GraphQLValue, Variables};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    GatewayContext, GraphQLRequest,
    error::GatewayError,
    resolver_table::{Resolver, ResolverTable},
    schema_registry::{FieldContract, FieldCoordinate, FieldType, SchemaRegistry},
};

/// The executable gateway: the declared schema with every field wired to
/// its resolver and the clients injected as schema data.
pub struct Gateway {
    schema: Schema,
}

impl Gateway {
    /// Builds the executable schema.
    ///
    /// Fails when a resolver targets a field the registry does not declare,
    /// or when a root field has no resolver. Non-root object fields without
    /// a binding resolve to the same-named property of their parent.
    pub fn new(
        registry: &SchemaRegistry,
        table: &ResolverTable,
        context: GatewayContext,
    ) -> Result<Self, GatewayError> {
        if let Some(coordinate) = table
            .coordinates()
            .find(|coordinate| registry.field(coordinate).is_none())
        {
            return Err(GatewayError::UnknownField {
                coordinate: coordinate.to_string(),
            });
        }

        let mut builder = Schema::build(registry.query_type(), registry.mutation_type(), None);

        for object in registry.objects() {
            let mut dynamic_object = Object::new(object.name.as_str());

            for field in &object.fields {
                let coordinate = FieldCoordinate::new(&object.name, &field.name);
                let mut dynamic_field = match table.get(&coordinate) {
                    Some(resolver) => bound_field(coordinate, field, resolver.clone()),
                    None if registry.is_root(&object.name) => {
                        return Err(GatewayError::UnresolvedField {
                            coordinate: coordinate.to_string(),
                        });
                    }
                    None => property_field(field),
                };

                for argument in &field.arguments {
                    dynamic_field = dynamic_field.argument(InputValue::new(
                        argument.name.as_str(),
                        type_ref(&argument.ty),
                    ));
                }
                dynamic_object = dynamic_object.field(dynamic_field);
            }

            builder = builder.register(dynamic_object);
        }

        let schema = builder
            .data(context)
            .finish()
            .map_err(|e| GatewayError::InvalidSchema {
                message: e.to_string(),
            })?;

        info!(bindings = table.coordinates().count(), "gateway schema built");
        Ok(Gateway { schema })
    }

    /// Executes one GraphQL request. Field failures are reported in the
    /// response's `errors` next to whatever data did resolve.
    pub async fn process_request(&self, request: GraphQLRequest) -> Result<Value, GatewayError> {
        debug!(operation = ?request.operation_name, "processing request");

        let mut graphql_request = async_graphql::Request::new(request.query);
        if let Some(operation_name) = request.operation_name {
            graphql_request = graphql_request.operation_name(operation_name);
        }
        if let Some(variables) = request.variables {
            graphql_request = graphql_request.variables(Variables::from_json(variables));
        }

        let response = self.schema.execute(graphql_request).await;
        if !response.errors.is_empty() {
            debug!(errors = response.errors.len(), "request completed with errors");
        }

        serde_json::to_value(&response).map_err(|e| GatewayError::Internal {
            message: format!("failed to serialize response: {e}"),
        })
    }
}

fn type_ref(ty: &FieldType) -> TypeRef {
    match ty {
        FieldType::Named(name) => TypeRef::Named(name.clone().into()),
        FieldType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
        FieldType::NonNull(inner) => TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn bound_field(coordinate: FieldCoordinate, field: &FieldContract, resolver: Resolver) -> Field {
    let nullable = !field.ty.is_non_null();
    Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        resolver.call(&coordinate, nullable, ctx)
    })
}

fn property_field(field: &FieldContract) -> Field {
    let name = field.name.clone();
    Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        let value = match ctx.parent_value.as_value() {
            Some(GraphQLValue::Object(properties)) => properties.get(name.as_str()).cloned(),
            _ => None,
        };
        FieldFuture::new(async move { Ok(value.map(FieldValue::value)) })
    })
}
