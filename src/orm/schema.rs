//! Entity schemas: SQL templates computed once per declared entity, and the registry
//! that hands them out by entity type.

use crate::error::{OrmError, SchemaError};
use crate::orm::entity::Entity;
use crate::orm::field::Field;
use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Backtick-quote a MySQL identifier (identifiers come from declarations only).
pub fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Collects field declarations for one table; `build` validates them and renders SQL.
#[derive(Clone, Debug)]
pub struct SchemaBuilder {
    table: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new(table: &str) -> Self {
        SchemaBuilder {
            table: table.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<EntitySchema, SchemaError> {
        if self.table.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }
        let mut seen = HashSet::new();
        let mut primary_key: Option<String> = None;
        let mut field_names = Vec::new();
        for f in &self.fields {
            if !seen.insert(f.name()) {
                return Err(SchemaError::DuplicateField {
                    table: self.table.clone(),
                    field: f.name().to_string(),
                });
            }
            f.check_primary_key()?;
            if f.is_primary_key() {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        table: self.table.clone(),
                        field: f.name().to_string(),
                    });
                }
                primary_key = Some(f.name().to_string());
            } else {
                field_names.push(f.name().to_string());
            }
        }
        let primary_key = primary_key.ok_or_else(|| SchemaError::MissingPrimaryKey {
            table: self.table.clone(),
        })?;

        let table = quoted(&self.table);
        let pk = quoted(&primary_key);
        let escaped: Vec<String> = field_names.iter().map(|f| quoted(f)).collect();

        let mut select_cols = vec![pk.clone()];
        select_cols.extend(escaped.iter().cloned());
        let select_sql = format!("select {} from {}", select_cols.join(", "), table);

        let mut insert_cols = escaped.clone();
        insert_cols.push(pk.clone());
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            table,
            insert_cols.join(", "),
            placeholders(insert_cols.len())
        );

        let sets: Vec<String> = escaped.iter().map(|c| format!("{}=?", c)).collect();
        let update_sql = (!sets.is_empty())
            .then(|| format!("update {} set {} where {}=?", table, sets.join(", "), pk));
        let delete_sql = format!("delete from {} where {}=?", table, pk);

        Ok(EntitySchema {
            table: self.table,
            fields: self.fields,
            primary_key,
            field_names,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }
}

/// Immutable per-entity metadata and SQL templates (`?` placeholders).
#[derive(Debug)]
pub struct EntitySchema {
    table: String,
    fields: Vec<Field>,
    primary_key: String,
    field_names: Vec<String>,
    select_sql: String,
    insert_sql: String,
    /// `None` when the key is the only column.
    update_sql: Option<String>,
    delete_sql: String,
}

impl EntitySchema {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key field names in declaration order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&Field, OrmError> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| OrmError::UnknownField {
                table: self.table.clone(),
                field: name.to_string(),
            })
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> Option<&str> {
        self.update_sql.as_deref()
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// `select ... where pk=?`, one parameter.
    pub fn select_by_pk_sql(&self) -> String {
        format!("{} where {}=?", self.select_sql, quoted(&self.primary_key))
    }

    /// Idempotent DDL built from the field descriptors.
    pub fn create_table_sql(&self) -> String {
        let mut cols: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {} not null", quoted(f.name()), f.sql_type()))
            .collect();
        cols.push(format!("primary key ({})", quoted(&self.primary_key)));
        format!(
            "create table if not exists {} ({}) engine=innodb default charset=utf8mb4",
            quoted(&self.table),
            cols.join(", ")
        )
    }
}

/// Schemas of every registered entity, keyed by Rust type. Built once at startup.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    by_type: HashMap<TypeId, Arc<EntitySchema>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry::default()
    }

    /// Build and store the schema declared by `E`. Fails on an invalid declaration.
    pub fn register<E: Entity>(&mut self) -> Result<&mut Self, SchemaError> {
        let schema = E::declare().build()?;
        tracing::info!(model = type_name::<E>(), table = %schema.table(), "found model");
        for f in schema.fields() {
            tracing::debug!(field = %f, "found mapping");
        }
        self.by_type.insert(TypeId::of::<E>(), Arc::new(schema));
        Ok(self)
    }

    pub fn schema<E: Entity>(&self) -> Result<Arc<EntitySchema>, OrmError> {
        self.by_type
            .get(&TypeId::of::<E>())
            .cloned()
            .ok_or(OrmError::Unregistered(type_name::<E>()))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.by_type.values()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
