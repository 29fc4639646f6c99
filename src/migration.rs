//! Schema bootstrap: `create table if not exists` for every registered entity.

use crate::error::OrmError;
use crate::orm::Orm;

/// Create missing tables, in table-name order. Existing tables are left untouched.
pub async fn apply_migrations(orm: &Orm) -> Result<(), OrmError> {
    let mut schemas: Vec<_> = orm.models().schemas().cloned().collect();
    schemas.sort_by(|a, b| a.table().cmp(b.table()));
    for schema in schemas {
        let ddl = schema.create_table_sql();
        orm.pool().execute(&ddl, &[]).await?;
        tracing::info!(table = %schema.table(), "table ready");
    }
    Ok(())
}
