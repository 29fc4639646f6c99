//! Blog entities: users, blogs and comments.

use crate::error::{OrmError, SchemaError};
use crate::orm::{convert, Entity, Field, ModelRegistry, SchemaBuilder};
use serde::Serialize;
use serde_json::Value;

/// 15-digit millisecond timestamp, 32 hex chars of a v4 uuid, then `000`.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Seconds since the epoch, with millisecond precision.
pub fn now_ts() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

fn next_id_value() -> Value {
    Value::String(next_id())
}

fn now_value() -> Value {
    Value::from(now_ts())
}

fn unknown(table: &str, field: &str) -> OrmError {
    OrmError::UnknownField {
        table: table.to_string(),
        field: field.to_string(),
    }
}

/// Register every blog entity; run once at startup.
pub fn register_models(models: &mut ModelRegistry) -> Result<(), SchemaError> {
    models
        .register::<User>()?
        .register::<Blog>()?
        .register::<Comment>()?;
    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub passwd: Option<String>,
    pub admin: Option<bool>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<f64>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.admin.unwrap_or(false)
    }

    /// Mask the stored password hash before the record leaves the server.
    pub fn scrub(mut self) -> Self {
        self.passwd = Some("******".into());
        self
    }
}

impl Entity for User {
    fn declare() -> SchemaBuilder {
        SchemaBuilder::new("users")
            .field(Field::string("id").primary_key().default_with(next_id_value).ddl("varchar(50)"))
            .field(Field::string("email").ddl("varchar(50)"))
            .field(Field::string("passwd").ddl("varchar(64)"))
            .field(Field::boolean("admin"))
            .field(Field::string("name").ddl("varchar(50)"))
            .field(Field::string("image").ddl("varchar(500)"))
            .field(Field::float("created_at").default_with(now_value))
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => self.id.clone().map(Value::from),
            "email" => self.email.clone().map(Value::from),
            "passwd" => self.passwd.clone().map(Value::from),
            "admin" => self.admin.map(Value::from),
            "name" => self.name.clone().map(Value::from),
            "image" => self.image.clone().map(Value::from),
            "created_at" => self.created_at.map(Value::from),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), OrmError> {
        match field {
            "id" => self.id = convert::string(field, value)?,
            "email" => self.email = convert::string(field, value)?,
            "passwd" => self.passwd = convert::string(field, value)?,
            "admin" => self.admin = convert::boolean(field, value)?,
            "name" => self.name = convert::string(field, value)?,
            "image" => self.image = convert::string(field, value)?,
            "created_at" => self.created_at = convert::float(field, value)?,
            _ => return Err(unknown("users", field)),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Blog {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Entity for Blog {
    fn declare() -> SchemaBuilder {
        SchemaBuilder::new("blogs")
            .field(Field::string("id").primary_key().default_with(next_id_value).ddl("varchar(50)"))
            .field(Field::string("user_id").ddl("varchar(50)"))
            .field(Field::string("user_name").ddl("varchar(50)"))
            .field(Field::string("user_image").ddl("varchar(500)"))
            .field(Field::string("name").ddl("varchar(50)"))
            .field(Field::string("summary").ddl("varchar(200)"))
            .field(Field::text("content"))
            .field(Field::float("created_at").default_with(now_value))
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => self.id.clone().map(Value::from),
            "user_id" => self.user_id.clone().map(Value::from),
            "user_name" => self.user_name.clone().map(Value::from),
            "user_image" => self.user_image.clone().map(Value::from),
            "name" => self.name.clone().map(Value::from),
            "summary" => self.summary.clone().map(Value::from),
            "content" => self.content.clone().map(Value::from),
            "created_at" => self.created_at.map(Value::from),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), OrmError> {
        match field {
            "id" => self.id = convert::string(field, value)?,
            "user_id" => self.user_id = convert::string(field, value)?,
            "user_name" => self.user_name = convert::string(field, value)?,
            "user_image" => self.user_image = convert::string(field, value)?,
            "name" => self.name = convert::string(field, value)?,
            "summary" => self.summary = convert::string(field, value)?,
            "content" => self.content = convert::string(field, value)?,
            "created_at" => self.created_at = convert::float(field, value)?,
            _ => return Err(unknown("blogs", field)),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Comment {
    pub id: Option<String>,
    pub blog_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Entity for Comment {
    fn declare() -> SchemaBuilder {
        SchemaBuilder::new("comments")
            .field(Field::string("id").primary_key().default_with(next_id_value).ddl("varchar(50)"))
            .field(Field::string("blog_id").ddl("varchar(50)"))
            .field(Field::string("user_id").ddl("varchar(50)"))
            .field(Field::string("user_name").ddl("varchar(50)"))
            .field(Field::string("user_image").ddl("varchar(500)"))
            .field(Field::text("content"))
            .field(Field::float("created_at").default_with(now_value))
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => self.id.clone().map(Value::from),
            "blog_id" => self.blog_id.clone().map(Value::from),
            "user_id" => self.user_id.clone().map(Value::from),
            "user_name" => self.user_name.clone().map(Value::from),
            "user_image" => self.user_image.clone().map(Value::from),
            "content" => self.content.clone().map(Value::from),
            "created_at" => self.created_at.map(Value::from),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), OrmError> {
        match field {
            "id" => self.id = convert::string(field, value)?,
            "blog_id" => self.blog_id = convert::string(field, value)?,
            "user_id" => self.user_id = convert::string(field, value)?,
            "user_name" => self.user_name = convert::string(field, value)?,
            "user_image" => self.user_image = convert::string(field, value)?,
            "content" => self.content = convert::string(field, value)?,
            "created_at" => self.created_at = convert::float(field, value)?,
            _ => return Err(unknown("comments", field)),
        }
        Ok(())
    }
}
