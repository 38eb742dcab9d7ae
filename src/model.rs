use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A user mirrored from the upstream REST collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    #[serde(deserialize_with = "normalized_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A row of the relational `users` table.
///
/// Serializes its id as a string so that it fits the `ID!` field it is
/// exposed through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RelationalUser {
    #[serde(serialize_with = "id_as_string")]
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "normalized_id")]
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(deserialize_with = "normalized_id")]
    pub user_id: String,
}

impl Post {
    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

/// Accepts ids encoded either as JSON strings or numbers and keeps their
/// decimal string form, so that ids from different sources compare equal.
pub fn normalized_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

fn id_as_string<S>(id: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(id)
}
