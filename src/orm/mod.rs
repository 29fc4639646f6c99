//! Schema-driven mapping of record types to MySQL tables.

pub mod crud;
pub mod entity;
pub mod field;
pub mod schema;

pub use crud::Orm;
pub use entity::{convert, value_of, value_or_default, Entity};
pub use field::{DefaultFactory, Field, FieldDefault, FieldKind};
pub use schema::{EntitySchema, ModelRegistry, SchemaBuilder};
