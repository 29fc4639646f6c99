//! CRUD execution: the cached templates of each entity, run through the injected pool.

use crate::error::OrmError;
use crate::orm::entity::{value_of, value_or_default, Entity};
use crate::orm::schema::{EntitySchema, ModelRegistry};
use crate::sql::{find_all, find_number, FindAll};
use crate::store::DbPool;
use serde_json::Value;
use std::sync::Arc;

/// Pool plus model registry; cheap to clone, passed to every data-access path.
#[derive(Clone)]
pub struct Orm {
    pool: DbPool,
    models: Arc<ModelRegistry>,
}

impl Orm {
    pub fn new(pool: DbPool, models: ModelRegistry) -> Self {
        Orm {
            pool,
            models: Arc::new(models),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn schema<E: Entity>(&self) -> Result<Arc<EntitySchema>, OrmError> {
        self.models.schema::<E>()
    }

    /// Fetch one record by primary key; `None` when no row matches.
    pub async fn find<E: Entity>(&self, pk: impl Into<Value>) -> Result<Option<E>, OrmError> {
        let schema = self.schema::<E>()?;
        let rows = self.pool.select(&schema.select_by_pk_sql(), &[pk.into()], Some(1)).await?;
        rows.into_iter().next().map(E::from_row).transpose()
    }

    pub async fn find_all<E: Entity>(&self, opts: FindAll) -> Result<Vec<E>, OrmError> {
        let schema = self.schema::<E>()?;
        let q = find_all(&schema, &opts);
        let rows = self.pool.select(&q.sql, &q.params, None).await?;
        rows.into_iter().map(E::from_row).collect()
    }

    /// Scalar from `select <expr> as _num_ ...`; `None` when the query yields no row.
    pub async fn find_number<E: Entity>(
        &self,
        select_expr: &str,
        where_clause: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, OrmError> {
        let schema = self.schema::<E>()?;
        let q = find_number(&schema, select_expr, where_clause, args);
        let rows = self.pool.select(&q.sql, &q.params, Some(1)).await?;
        Ok(rows.into_iter().next().and_then(|mut r| r.remove("_num_")))
    }

    /// Insert `entity`, filling unset fields (key included) from their defaults.
    /// Returns the affected-row count; anything other than 1 is logged, not raised.
    pub async fn save<E: Entity>(&self, entity: &mut E) -> Result<u64, OrmError> {
        let schema = self.schema::<E>()?;
        let mut args = Vec::with_capacity(schema.field_names().len() + 1);
        for f in schema.field_names() {
            args.push(value_or_default(entity, &schema, f)?);
        }
        args.push(value_or_default(entity, &schema, schema.primary_key())?);
        let rows = self.pool.execute(schema.insert_sql(), &args).await?;
        if rows != 1 {
            tracing::warn!(table = %schema.table(), rows, "failed to insert record: affected rows");
        }
        Ok(rows)
    }

    /// Write every field of `entity` back by primary key, without defaults.
    /// A table whose only column is its key has nothing to update and reports 0 rows.
    pub async fn update<E: Entity>(&self, entity: &E) -> Result<u64, OrmError> {
        let schema = self.schema::<E>()?;
        let Some(sql) = schema.update_sql() else {
            tracing::debug!(table = %schema.table(), "key-only table, nothing to update");
            return Ok(0);
        };
        let mut args: Vec<Value> = schema.field_names().iter().map(|f| value_of(entity, f)).collect();
        args.push(value_of(entity, schema.primary_key()));
        let rows = self.pool.execute(sql, &args).await?;
        if rows != 1 {
            tracing::warn!(table = %schema.table(), rows, "failed to update by primary key: affected rows");
        }
        Ok(rows)
    }

    pub async fn remove<E: Entity>(&self, entity: &E) -> Result<u64, OrmError> {
        let schema = self.schema::<E>()?;
        let args = [value_of(entity, schema.primary_key())];
        let rows = self.pool.execute(schema.delete_sql(), &args).await?;
        if rows != 1 {
            tracing::warn!(table = %schema.table(), rows, "failed to remove by primary key: affected rows");
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Blog, User};
    use crate::store::fake::ScriptedExecutor;
    use crate::store::Row;
    use serde_json::json;

    fn orm(exec: Arc<ScriptedExecutor>) -> Orm {
        let mut models = ModelRegistry::new();
        models.register::<User>().unwrap().register::<Blog>().unwrap();
        Orm::new(exec, models)
    }

    /// Turn the arguments of a recorded insert back into the row `select` would return.
    fn row_from_insert(schema: &EntitySchema, args: &[Value]) -> Row {
        let mut row = Row::new();
        row.insert(schema.primary_key().to_string(), args[args.len() - 1].clone());
        for (name, v) in schema.field_names().iter().zip(args) {
            row.insert(name.clone(), v.clone());
        }
        row
    }

    #[tokio::test]
    async fn find_on_missing_key_is_none() {
        let exec = ScriptedExecutor::new();
        let orm = orm(exec.clone());
        let found: Option<Blog> = orm.find("nope").await.unwrap();
        assert!(found.is_none());
        let stmt = &exec.statements()[0];
        assert!(stmt.sql.ends_with("from `blogs` where `id`=?"));
        assert_eq!(stmt.args, vec![json!("nope")]);
        assert_eq!(stmt.size, Some(1));
    }

    #[tokio::test]
    async fn save_then_find_round_trips_every_field() {
        let exec = ScriptedExecutor::new();
        let orm = orm(exec.clone());
        let mut blog = Blog {
            user_id: Some("u1".into()),
            user_name: Some("Ann".into()),
            user_image: Some("about:blank".into()),
            name: Some("Hello".into()),
            summary: Some("First".into()),
            content: Some("Body".into()),
            ..Blog::default()
        };
        assert_eq!(orm.save(&mut blog).await.unwrap(), 1);
        let id = blog.id.clone().expect("id defaulted on save");
        assert!(blog.created_at.is_some());

        let schema = orm.schema::<Blog>().unwrap();
        let insert = exec.statements()[0].clone();
        assert_eq!(insert.sql, schema.insert_sql());
        exec.push_rows(vec![row_from_insert(&schema, &insert.args)]);

        let found: Blog = orm.find(id.as_str()).await.unwrap().unwrap();
        assert_eq!(serde_json::to_value(&found).unwrap(), serde_json::to_value(&blog).unwrap());
    }

    #[tokio::test]
    async fn row_count_mismatch_is_reported_not_raised() {
        let exec = ScriptedExecutor::new();
        let orm = orm(exec.clone());
        exec.push_affected(0);
        let blog = Blog {
            id: Some("b1".into()),
            ..Blog::default()
        };
        assert_eq!(orm.update(&blog).await.unwrap(), 0);
        exec.push_affected(0);
        assert_eq!(orm.remove(&blog).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_sends_current_values_without_defaults() {
        let exec = ScriptedExecutor::new();
        let orm = orm(exec.clone());
        let blog = Blog {
            id: Some("b1".into()),
            name: Some("n".into()),
            ..Blog::default()
        };
        orm.update(&blog).await.unwrap();
        let stmt = &exec.statements()[0];
        assert!(stmt.sql.starts_with("update `blogs` set "));
        assert_eq!(stmt.args.last(), Some(&json!("b1")));
        assert!(stmt.args.contains(&Value::Null));
    }

    #[tokio::test]
    async fn find_number_reads_the_aliased_column() {
        let exec = ScriptedExecutor::new();
        let orm = orm(exec.clone());
        let mut row = Row::new();
        row.insert("_num_".into(), json!(7));
        exec.push_rows(vec![row]);
        let n = orm.find_number::<Blog>("count(id)", None, &[]).await.unwrap();
        assert_eq!(n, Some(json!(7)));
        assert_eq!(orm.find_number::<Blog>("count(id)", None, &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_all_maps_every_row() {
        let exec = ScriptedExecutor::new();
        let orm = orm(exec.clone());
        let rows = (0..3)
            .map(|i| {
                let mut r = Row::new();
                r.insert("id".into(), json!(format!("b{i}")));
                r
            })
            .collect();
        exec.push_rows(rows);
        let blogs: Vec<Blog> = orm
            .find_all(FindAll::new().order_by("created_at desc").limit((0u64, 3u64)))
            .await
            .unwrap();
        assert_eq!(blogs.len(), 3);
        assert_eq!(blogs[2].id.as_deref(), Some("b2"));
    }

    #[tokio::test]
    async fn unregistered_entity_is_an_error() {
        let exec = ScriptedExecutor::new();
        let orm = Orm::new(exec, ModelRegistry::new());
        let err = orm.find::<User>("x").await.unwrap_err();
        assert!(matches!(err, OrmError::Unregistered(_)));
    }
}
