//! Newtype IDs for Bagisto entity references.
//!
//! Bagisto identifies products, cart items, and orders with positive
//! integers. Storefront clients are not consistent about how they send them
//! (`42` and `"42"` both show up in request bodies), so every id accepts
//! either form on input and always serialises as a number.

use serde::{Deserialize, Deserializer};

/// Errors that can occur when parsing an id from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input is not a number.
    #[error("id must be a positive integer, got {0:?}")]
    NotANumber(String),
    /// The input is zero or negative.
    #[error("id must be positive, got {0}")]
    NotPositive(i64),
}

/// Wire form accepted for ids: a JSON number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// Validate a raw integer as an entity id.
///
/// # Errors
///
/// Returns [`IdError::NotPositive`] if the value is zero, negative, or out of
/// `i32` range.
pub fn positive_id(value: i64) -> Result<i32, IdError> {
    match i32::try_from(value) {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(IdError::NotPositive(value)),
    }
}

/// Parse a textual id such as a path segment.
///
/// # Errors
///
/// Returns an [`IdError`] if the text is not a positive integer.
pub fn parse_id(text: &str) -> Result<i32, IdError> {
    let trimmed = text.trim();
    let value = trimmed
        .parse::<i64>()
        .map_err(|_| IdError::NotANumber(trimmed.to_owned()))?;
    positive_id(value)
}

#[doc(hidden)]
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match RawId::deserialize(deserializer)? {
        RawId::Number(n) => positive_id(n),
        RawId::Text(s) => parse_id(&s),
    };
    parsed.map_err(serde::de::Error::custom)
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize` as a plain number, lenient `Deserialize` (number or numeric string)
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `new()`, `as_i32()`, `Display`, and `FromStr`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use dukasasa_core::define_id;
/// define_id!(WarehouseId);
///
/// let id: WarehouseId = "7".parse().unwrap();
/// assert_eq!(id.as_i32(), 7);
/// assert!("0".parse::<WarehouseId>().is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_id(deserializer).map(Self)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                $crate::types::id::parse_id(s).map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(ProductId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(CredentialId);
