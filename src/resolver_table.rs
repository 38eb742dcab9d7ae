use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use async_graphql::{ErrorExtensions, Value};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::{GatewayContext, error::GatewayError, schema_registry::FieldCoordinate};

/// Typed input of one field, pulled out of the field arguments or the parent
/// object before the resolver runs.
pub trait FieldInput: Sized + Send + 'static {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError>;
}

impl FieldInput for () {
    fn extract(_ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        Ok(())
    }
}

/// What a resolver produced for its field.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Null,
    Value(Value),
    List(Vec<Value>),
}

impl Resolved {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Resolved::Value(value.into())
    }

    pub fn object<T: Serialize>(record: &T) -> Result<Self, GatewayError> {
        to_value(record).map(Resolved::Value)
    }

    pub fn list<T: Serialize>(records: &[T]) -> Result<Self, GatewayError> {
        records
            .iter()
            .map(to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Resolved::List)
    }

    pub fn into_field_value<'a>(self) -> Option<FieldValue<'a>> {
        match self {
            Resolved::Null => None,
            Resolved::Value(value) => Some(FieldValue::value(value)),
            Resolved::List(items) => Some(FieldValue::list(
                items.into_iter().map(|item| FieldValue::value(item)),
            )),
        }
    }
}

fn to_value<T: Serialize>(record: &T) -> Result<Value, GatewayError> {
    async_graphql::to_value(record).map_err(|e| GatewayError::Decode {
        message: e.to_string(),
    })
}

type PendingResolution = BoxFuture<'static, Result<Resolved, GatewayError>>;
type ResolveFn =
    dyn Fn(&ResolverContext<'_>) -> Result<PendingResolution, GatewayError> + Send + Sync;

/// An executable binding for one field.
#[derive(Clone)]
pub struct Resolver {
    resolve: Arc<ResolveFn>,
}

impl Resolver {
    /// Wraps an async handler taking the gateway context and the field's
    /// typed input.
    pub fn new<I, F, Fut>(handler: F) -> Self
    where
        I: FieldInput,
        F: Fn(GatewayContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resolved, GatewayError>> + Send + 'static,
    {
        let resolve: Arc<ResolveFn> = Arc::new(
            move |ctx: &ResolverContext<'_>| -> Result<PendingResolution, GatewayError> {
                let gateway = ctx
                    .data::<GatewayContext>()
                    .map_err(|e| GatewayError::Internal { message: e.message })?
                    .clone();
                let input = I::extract(ctx)?;
                Ok(handler(gateway, input).boxed())
            },
        );
        Resolver { resolve }
    }

    /// Runs the binding for one field of one request.
    ///
    /// A failure on a nullable field is recorded as an error at the field's
    /// path and the field resolves to `null`, leaving its siblings intact.
    /// On a non-null field the error propagates to the nearest nullable
    /// ancestor.
    pub fn call<'a>(
        &self,
        coordinate: &FieldCoordinate,
        nullable: bool,
        ctx: ResolverContext<'a>,
    ) -> FieldFuture<'a> {
        let pending = (self.resolve)(&ctx);
        let field_ctx = ctx.ctx;
        let coordinate = coordinate.to_string();
        FieldFuture::new(async move {
            let outcome = match pending {
                Ok(resolution) => resolution.await,
                Err(error) => Err(error),
            };
            let error = match outcome {
                Ok(resolved) => return Ok(resolved.into_field_value()),
                Err(error) => error,
            };

            tracing::warn!(field = %coordinate, %error, "field resolution failed");
            if !nullable {
                return Err(error.extend());
            }
            let error = error.extend().into_server_error(field_ctx.item.pos);
            field_ctx.add_error(field_ctx.set_error_path(error));
            Ok(Some(FieldValue::NULL))
        })
    }
}

/// Bindings from field coordinates to resolvers, with at most one resolver
/// per coordinate.
#[derive(Clone, Default)]
pub struct ResolverTable {
    bindings: BTreeMap<FieldCoordinate, Resolver>,
}

impl ResolverTable {
    pub fn builder() -> ResolverTableBuilder {
        ResolverTableBuilder::default()
    }

    pub fn get(&self, coordinate: &FieldCoordinate) -> Option<&Resolver> {
        self.bindings.get(coordinate)
    }

    pub fn coordinates(&self) -> impl Iterator<Item = &FieldCoordinate> {
        self.bindings.keys()
    }
}

/// Collects bindings in registration order; duplicates are reported by
/// [`ResolverTableBuilder::build`] rather than overwritten.
#[derive(Default)]
pub struct ResolverTableBuilder {
    bindings: Vec<(FieldCoordinate, Resolver)>,
}

impl ResolverTableBuilder {
    pub fn bind(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: Resolver,
    ) -> Self {
        self.bindings
            .push((FieldCoordinate::new(type_name, field_name), resolver));
        self
    }

    pub fn build(self) -> Result<ResolverTable, GatewayError> {
        let mut bindings = BTreeMap::new();
        for (coordinate, resolver) in self.bindings {
            if bindings.contains_key(&coordinate) {
                return Err(GatewayError::SchemaConflict {
                    coordinate: coordinate.to_string(),
                });
            }
            bindings.insert(coordinate, resolver);
        }
        Ok(ResolverTable { bindings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(text: &'static str) -> Resolver {
        Resolver::new(move |_gateway: GatewayContext, (): ()| async move {
            Ok::<_, GatewayError>(Resolved::scalar(text))
        })
    }

    #[test]
    fn duplicate_bindings_are_a_schema_conflict() {
        let result = ResolverTable::builder()
            .bind("Query", "users", constant("remote"))
            .bind("Query", "posts", constant("posts"))
            .bind("Query", "users", constant("relational"))
            .build();

        match result {
            Err(GatewayError::SchemaConflict { coordinate }) => {
                assert_eq!(coordinate, "Query.users")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("duplicate binding was accepted"),
        }
    }

    #[test]
    fn same_field_name_on_different_types_is_not_a_conflict() {
        let table = ResolverTable::builder()
            .bind("Query", "id", constant("a"))
            .bind("User", "id", constant("b"))
            .build()
            .unwrap();

        assert_eq!(table.coordinates().count(), 2);
        assert!(table.get(&FieldCoordinate::new("User", "id")).is_some());
        assert!(table.get(&FieldCoordinate::new("Post", "id")).is_none());
    }

    #[test]
    fn records_resolve_to_graphql_values() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Row {
            user_id: &'static str,
        }

        let resolved = Resolved::list(&[Row { user_id: "1" }, Row { user_id: "2" }]).unwrap();
        let expected = Resolved::List(vec![
            Value::from_json(json!({ "userId": "1" })).unwrap(),
            Value::from_json(json!({ "userId": "2" })).unwrap(),
        ]);

        assert_eq!(resolved, expected);
    }
}
