//! JSON document model shared by the store, the query layer and the in-memory engine.

use std::cmp::Ordering;

use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{DateTime, Utc};
use query_core::ast::PATH_SEPARATOR;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::store::{DbError, DbResult};

/// A stored record: a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Primary key field of every collection.
pub const ID_FIELD: &str = "_id";

/// Extended-JSON tag for arbitrary-precision decimals: `{"$numberDecimal": "12.50"}`.
pub const DECIMAL_TAG: &str = "$numberDecimal";

/// Resolve a dotted path (`price_info.chaos_price`) inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split(PATH_SEPARATOR);
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub fn to_document<T: Serialize>(record: &T) -> DbResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(doc) => Ok(doc),
        _ => Err(DbError::NotADocument),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> DbResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Wire form of a decimal value.
pub fn decimal_value(value: &BigDecimal) -> Value {
    let mut wrapper = Document::new();
    wrapper.insert(DECIMAL_TAG.to_string(), Value::String(value.to_string()));
    Value::Object(wrapper)
}

fn decimal_from_wire(obj: &Document) -> Option<BigDecimal> {
    if obj.len() != 1 {
        return None;
    }
    obj.get(DECIMAL_TAG)?.as_str()?.parse().ok()
}

/// Comparable value extracted from a document or coerced from a filter clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    DateTime(DateTime<Utc>),
}

impl Scalar {
    /// `None` for arrays and plain sub-documents, which are not comparable.
    pub fn from_value(value: &Value) -> Option<Scalar> {
        Some(match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Double(n.as_f64()?),
            },
            Value::String(s) => Scalar::String(s.clone()),
            Value::Object(obj) => Scalar::Decimal(decimal_from_wire(obj)?),
            Value::Array(_) => return None,
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Double(f) => Value::from(*f),
            Scalar::Decimal(d) => decimal_value(d),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::DateTime(dt) => Value::String(dt.to_rfc3339()),
        }
    }

    fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            Scalar::Int(i) => Some(BigDecimal::from(*i)),
            Scalar::Double(f) => BigDecimal::from_f64(*f),
            Scalar::Decimal(d) => Some(d.clone()),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Double(_) | Scalar::Decimal(_))
    }

    /// Cross-type rank used to order values that cannot be compared directly.
    pub(crate) fn type_rank(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Int(_) | Scalar::Double(_) | Scalar::Decimal(_) => 1,
            Scalar::String(_) => 2,
            Scalar::DateTime(_) => 3,
            Scalar::Bool(_) => 4,
        }
    }

    /// Numbers compare across representations; timestamps compare with RFC 3339 strings.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        use Scalar as S;
        match (self, other) {
            (S::Null, S::Null) => Some(Ordering::Equal),
            (S::Bool(a), S::Bool(b)) => Some(a.cmp(b)),
            (S::String(a), S::String(b)) => Some(a.cmp(b)),
            (S::DateTime(a), S::DateTime(b)) => Some(a.cmp(b)),
            (S::DateTime(a), S::String(b)) => parse_rfc3339(b).map(|b| a.cmp(&b)),
            (S::String(a), S::DateTime(b)) => parse_rfc3339(a).map(|a| a.cmp(b)),
            (S::Int(a), S::Int(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Some(a.as_decimal()?.cmp(&b.as_decimal()?))
            }
            _ => None,
        }
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Total order used when sorting documents: missing and null first, then by type rank.
pub(crate) fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.and_then(Scalar::from_value).unwrap_or(Scalar::Null);
    let b = b.and_then(Scalar::from_value).unwrap_or(Scalar::Null);
    a.compare(&b)
        .unwrap_or_else(|| a.type_rank().cmp(&b.type_rank()))
}

/// `#[serde(with = "modkit_db::document::decimal128")]` for `BigDecimal` fields stored
/// in the extended-JSON decimal form.
pub mod decimal128 {
    use bigdecimal::BigDecimal;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Wire {
        #[serde(rename = "$numberDecimal")]
        value: String,
    }

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        Wire {
            value: value.to_string(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
        let wire = Wire::deserialize(deserializer)?;
        wire.value.parse().map_err(de::Error::custom)
    }

    pub mod option {
        use super::Wire;
        use bigdecimal::BigDecimal;
        use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<BigDecimal>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value
                .as_ref()
                .map(|v| Wire {
                    value: v.to_string(),
                })
                .serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<BigDecimal>, D::Error> {
            Option::<Wire>::deserialize(deserializer)?
                .map(|w| w.value.parse().map_err(de::Error::custom))
                .transpose()
        }
    }
}
