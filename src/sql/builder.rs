//! Builds the ad-hoc `select` statements (`find_all`, `find_number`) on top of an
//! entity's cached templates. Caller-provided clauses are passed through verbatim;
//! values always travel as parameters.

use crate::error::OrmError;
use crate::orm::EntitySchema;
use crate::orm::schema::quoted;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, clause: &str) {
        self.sql.push(' ');
        self.sql.push_str(clause);
    }
}

/// Row window for `find_all`: a count, or an offset and a count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Range(u64, u64),
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Limit::Count(n)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Range(offset, count)
    }
}

/// Dynamic limits (for instance from a JSON request): a non-negative integer or a
/// two-element array of non-negative integers. Any other shape is rejected.
impl TryFrom<&Value> for Limit {
    type Error = OrmError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        let invalid = || OrmError::InvalidLimit(v.to_string());
        match v {
            Value::Number(n) => n.as_u64().map(Limit::Count).ok_or_else(invalid),
            Value::Array(items) if items.len() == 2 => {
                let offset = items[0].as_u64().ok_or_else(invalid)?;
                let count = items[1].as_u64().ok_or_else(invalid)?;
                Ok(Limit::Range(offset, count))
            }
            _ => Err(invalid()),
        }
    }
}

/// Options for `find_all`: `where` clause with its arguments, `order by`, and `limit`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindAll {
    pub where_clause: Option<String>,
    pub args: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        FindAll::default()
    }

    pub fn filter<I>(mut self, clause: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.where_clause = Some(clause.to_string());
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

/// `select ... [where ...] [order by ...] [limit ?[, ?]]`.
pub fn find_all(schema: &EntitySchema, opts: &FindAll) -> QueryBuf {
    let mut q = QueryBuf::new(schema.select_sql());
    if let Some(w) = opts.where_clause.as_deref().filter(|w| !w.trim().is_empty()) {
        q.push("where");
        q.push(w);
    }
    q.params.extend(opts.args.iter().cloned());
    if let Some(o) = opts.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
        q.push("order by");
        q.push(o);
    }
    match opts.limit {
        None => {}
        Some(Limit::Count(n)) => {
            q.push("limit ?");
            q.params.push(Value::from(n));
        }
        Some(Limit::Range(offset, count)) => {
            q.push("limit ?, ?");
            q.params.push(Value::from(offset));
            q.params.push(Value::from(count));
        }
    }
    q
}

/// `select <expr> as _num_ from <table> [where ...]`.
pub fn find_number(schema: &EntitySchema, select_expr: &str, where_clause: Option<&str>, args: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new(format!("select {} as _num_ from {}", select_expr, quoted(schema.table())));
    if let Some(w) = where_clause.filter(|w| !w.trim().is_empty()) {
        q.push("where");
        q.push(w);
    }
    q.params.extend(args.iter().cloned());
    q
}
