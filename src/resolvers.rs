//! The field bindings served by the gateway and the typed input of each
//! field.

use async_graphql::Value;
use async_graphql::dynamic::{ResolverContext, ValueAccessor};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    GatewayContext,
    error::GatewayError,
    resolver_table::{FieldInput, Resolved, Resolver, ResolverTable},
};

/// Which backing store answers `Query.users`.
///
/// Exactly one is bound; the other list stays out of the schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UsersSource {
    /// Rows of the relational `users` table.
    #[default]
    Relational,
    /// The upstream `/users` collection.
    Remote,
}

fn argument<'a>(
    ctx: &'a ResolverContext<'_>,
    name: &str,
) -> Result<ValueAccessor<'a>, GatewayError> {
    ctx.args
        .try_get(name)
        .map_err(|e| GatewayError::invalid_input(e.message))
}

fn string_argument(ctx: &ResolverContext<'_>, name: &str) -> Result<String, GatewayError> {
    argument(ctx, name)?
        .string()
        .map(str::to_string)
        .map_err(|e| GatewayError::invalid_input(e.message))
}

fn int_argument(ctx: &ResolverContext<'_>, name: &str) -> Result<i64, GatewayError> {
    argument(ctx, name)?
        .i64()
        .map_err(|e| GatewayError::invalid_input(e.message))
}

/// Reads an `ID` given either as a string or an integer literal.
fn id_argument(ctx: &ResolverContext<'_>, name: &str) -> Result<String, GatewayError> {
    id_string(argument(ctx, name)?.as_value())
        .ok_or_else(|| GatewayError::invalid_input(format!("argument {name} is not an ID")))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub struct HelloArgs {
    pub name: String,
}

impl FieldInput for HelloArgs {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        Ok(HelloArgs {
            name: string_argument(ctx, "name")?,
        })
    }
}

pub struct UserArgs {
    pub id: String,
}

impl FieldInput for UserArgs {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        Ok(UserArgs {
            id: id_argument(ctx, "id")?,
        })
    }
}

pub struct CreateUserArgs {
    pub name: String,
    pub email: String,
}

impl FieldInput for CreateUserArgs {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        Ok(CreateUserArgs {
            name: string_argument(ctx, "name")?,
            email: string_argument(ctx, "email")?,
        })
    }
}

pub struct UpdateUserArgs {
    pub id: i64,
    pub name: String,
}

impl FieldInput for UpdateUserArgs {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        Ok(UpdateUserArgs {
            id: int_argument(ctx, "id")?,
            name: string_argument(ctx, "name")?,
        })
    }
}

pub struct DeleteUserArgs {
    pub id: i64,
}

impl FieldInput for DeleteUserArgs {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        Ok(DeleteUserArgs {
            id: int_argument(ctx, "id")?,
        })
    }
}

/// The `User` object a nested field is resolved on, reduced to its id.
pub struct ParentUser {
    pub id: String,
}

impl FieldInput for ParentUser {
    fn extract(ctx: &ResolverContext<'_>) -> Result<Self, GatewayError> {
        let id = match ctx.parent_value.as_value() {
            Some(Value::Object(fields)) => fields.get("id").and_then(id_string),
            _ => None,
        };
        id.map(|id| ParentUser { id })
            .ok_or_else(|| GatewayError::invalid_input("parent user has no id"))
    }
}

pub fn hello(args: &HelloArgs) -> String {
    format!("Hello {}", args.name)
}

async fn resolve_hello(
    _gateway: GatewayContext,
    args: HelloArgs,
) -> Result<Resolved, GatewayError> {
    Ok(Resolved::scalar(hello(&args)))
}

async fn resolve_relational_users(
    gateway: GatewayContext,
    (): (),
) -> Result<Resolved, GatewayError> {
    let users = gateway.store.list_all().await?;
    debug!(count = users.len(), "listed relational users");
    Resolved::list(&users)
}

async fn resolve_remote_users(gateway: GatewayContext, (): ()) -> Result<Resolved, GatewayError> {
    let users = gateway.remote.list_users().await?;
    debug!(count = users.len(), "listed remote users");
    Resolved::list(&users)
}

async fn resolve_user(gateway: GatewayContext, args: UserArgs) -> Result<Resolved, GatewayError> {
    let user = gateway.remote.get_user(&args.id).await?;
    Resolved::object(&user)
}

async fn resolve_posts(gateway: GatewayContext, (): ()) -> Result<Resolved, GatewayError> {
    let posts = gateway.remote.list_posts().await?;
    Resolved::list(&posts)
}

/// Posts whose `userId` equals the parent's id. Both sides are normalized
/// to strings, and every call scans the full post list.
async fn resolve_my_posts(
    gateway: GatewayContext,
    parent: ParentUser,
) -> Result<Resolved, GatewayError> {
    let posts = gateway.remote.list_posts().await?;
    let mine: Vec<_> = posts
        .into_iter()
        .filter(|post| post.belongs_to(&parent.id))
        .collect();
    debug!(user = %parent.id, count = mine.len(), "joined posts to user");
    Resolved::list(&mine)
}

async fn resolve_create_user(
    gateway: GatewayContext,
    args: CreateUserArgs,
) -> Result<Resolved, GatewayError> {
    let user = gateway.store.create(&args.name, &args.email).await?;
    Resolved::object(&user)
}

async fn resolve_update_user(
    gateway: GatewayContext,
    args: UpdateUserArgs,
) -> Result<Resolved, GatewayError> {
    let user = gateway.store.update(args.id, &args.name).await?;
    Resolved::object(&user)
}

async fn resolve_delete_user(
    gateway: GatewayContext,
    args: DeleteUserArgs,
) -> Result<Resolved, GatewayError> {
    let user = gateway.store.delete(args.id).await?;
    Resolved::object(&user)
}

/// The resolver for `Query.users` backed by `source`.
pub fn users_resolver(source: UsersSource) -> Resolver {
    match source {
        UsersSource::Relational => Resolver::new(resolve_relational_users),
        UsersSource::Remote => Resolver::new(resolve_remote_users),
    }
}

/// Every binding of the gateway schema, with `Query.users` answered by
/// `users_source`.
pub fn standard_table(users_source: UsersSource) -> Result<ResolverTable, GatewayError> {
    ResolverTable::builder()
        .bind("Query", "hello", Resolver::new(resolve_hello))
        .bind("Query", "users", users_resolver(users_source))
        .bind("Query", "user", Resolver::new(resolve_user))
        .bind("Query", "posts", Resolver::new(resolve_posts))
        .bind("User", "myPosts", Resolver::new(resolve_my_posts))
        .bind("Mutation", "createUser", Resolver::new(resolve_create_user))
        .bind("Mutation", "updateUser", Resolver::new(resolve_update_user))
        .bind("Mutation", "deleteUser", Resolver::new(resolve_delete_user))
        .build()
}
