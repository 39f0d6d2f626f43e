pub mod db;
pub mod domains;
pub mod error;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use domains::user::{
  model::{Schema, User, UserBase, UserCreate, UserInDb, UserUpdate},
  record::{UserAttributes, UserRecord},
  validation::{FieldViolation, ValidationError, ViolationKind},
};
pub use utils::error::AppError;
