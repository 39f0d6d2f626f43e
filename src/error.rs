/// Macro to generate common From implementations for service errors
///
/// Usage:
/// ```ignore
/// impl_service_error_conversions!(UserServiceError, InternalServerError);
/// impl_service_error_conversions!(UserServiceError, InternalServerError, NotFound, Conflict);
/// ```
#[macro_export]
macro_rules! impl_service_error_conversions {
  ($error_type:ty, $internal_variant:ident) => {
    impl From<sqlx::Error> for $error_type {
      fn from(err: sqlx::Error) -> Self {
        <$error_type>::$internal_variant(format!("Database error: {}", err))
      }
    }
  };

  ($error_type:ty, $internal_variant:ident, $not_found_variant:ident, $conflict_variant:ident) => {
    $crate::impl_service_error_conversions!($error_type, $internal_variant);

    impl From<$crate::domains::user::repository::RepositoryError> for $error_type {
      fn from(err: $crate::domains::user::repository::RepositoryError) -> Self {
        use $crate::domains::user::repository::RepositoryError;
        match err {
          RepositoryError::DatabaseError(e) => <$error_type>::$internal_variant(format!("Database error: {}", e)),
          RepositoryError::NotFound(msg) => <$error_type>::$not_found_variant(msg),
          RepositoryError::Conflict(msg) => <$error_type>::$conflict_variant(msg),
        }
      }
    }
  };
}

/// Macro to route serde for a user shape through its `Schema` impl, so a value
/// deserialized by any framework extractor has been validated.
///
/// Usage:
/// ```ignore
/// impl_schema_serde!(UserBase, UserCreate);
/// ```
#[macro_export]
macro_rules! impl_schema_serde {
  ($($shape:ty),+ $(,)?) => {
    $(
      impl serde::Serialize for $shape {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
          let map = $crate::domains::user::model::Schema::to_map(self);
          serde::Serialize::serialize(&map, serializer)
        }
      }

      impl<'de> serde::Deserialize<'de> for $shape {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
          let map = <serde_json::Map<String, serde_json::Value> as serde::Deserialize>::deserialize(deserializer)?;
          <$shape as $crate::domains::user::model::Schema>::from_map(&map).map_err(serde::de::Error::custom)
        }
      }
    )+
  };
}
