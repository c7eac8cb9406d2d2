use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One entity as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource<A> {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: A,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<RelationshipLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<RelationshipLink>
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLink {
    #[serde(default)]
    pub data: Option<ResourceIdentifier>
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "string_or_number")]
    pub id: String
}

impl<A> Resource<A> {
    /// The id of the related organization, if there is one.
    pub fn organization_id(&self) -> Option<&str> {
        self.relationships
            .as_ref()
            .and_then(|relationships| relationships.organization.as_ref())
            .and_then(|link| link.data.as_ref())
            .map(|identifier| identifier.id.as_str())
    }

    pub fn account_id(&self) -> Option<&str> {
        self.relationships
            .as_ref()
            .and_then(|relationships| relationships.account.as_ref())
            .and_then(|link| link.data.as_ref())
            .map(|identifier| identifier.id.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMeta {
    pub total: u64
}

/// The envelope of a collection response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListDocument<A> {
    pub data: Vec<Resource<A>>,
    #[serde(default)]
    pub meta: ListMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>
}

/// The envelope of a single entity response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleDocument<A> {
    pub data: Resource<A>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        )))
    }
}

/// Serde helpers for timestamps. The API sends either RFC 3339 strings or naive ISO 8601
/// date-times, the latter are taken to be UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp {:?}", s)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<DateTime<Utc>>,
            serializer: S
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none()
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => super::parse(&s)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp {:?}", s))),
                None => Ok(None)
            }
        }
    }
}
