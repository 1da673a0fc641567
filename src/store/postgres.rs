use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use serde_json::Value;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    Condition, Direction, Document, DocumentStore, Fields, Query, SnapshotStream, StoreError,
    Write,
};

/// Channel the `documents` trigger notifies with the changed collection name.
const CHANGE_CHANNEL: &str = "shifter_documents";

/// Document store over a single Postgres `documents` table (jsonb payloads).
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            fields: row.data.0,
        }
    }
}

async fn query_documents(
    pool: &PgPool,
    collection: &str,
    query: &Query,
) -> Result<Vec<Document>, StoreError> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
    qb.push_bind(collection.to_string());

    for filter in &query.filters {
        match &filter.condition {
            Condition::Eq(value) => {
                qb.push(" AND data -> ");
                qb.push_bind(filter.field.clone());
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
            }
            Condition::Gte(Value::Number(n)) => {
                qb.push(" AND (data ->> ");
                qb.push_bind(filter.field.clone());
                qb.push(")::float8 >= ");
                qb.push_bind(n.as_f64().unwrap_or(0.0));
            }
            Condition::Gte(value) => {
                let bound = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                qb.push(" AND data ->> ");
                qb.push_bind(filter.field.clone());
                qb.push(" >= ");
                qb.push_bind(bound);
            }
        }
    }

    match &query.order_by {
        Some((field, direction)) => {
            qb.push(" ORDER BY data ->> ");
            qb.push_bind(field.clone());
            qb.push(match direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
            qb.push(", seq ASC");
        }
        None => {
            qb.push(" ORDER BY seq ASC");
        }
    }

    let rows: Vec<DocumentRow> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(Document::from).collect())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        query_documents(&self.pool, collection, query).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn insert(&self, collection: &str, write: Write) -> Result<String, StoreError> {
        let id = Uuid::now_v7().simple().to_string();
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(write.resolve()))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, write: Write) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
             ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(write.resolve()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, write: Write) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET data = data || $3, updated_at = now()
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(write.resolve()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{collection}/{id}")));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = $1")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn subscribe(&self, collection: &str, query: Query) -> Result<SnapshotStream, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let state = Subscription {
            listener,
            pool: self.pool.clone(),
            collection: collection.to_string(),
            query,
            primed: false,
            done: false,
        };

        Ok(stream::unfold(state, next_snapshot).boxed())
    }
}

struct Subscription {
    listener: PgListener,
    pool: PgPool,
    collection: String,
    query: Query,
    primed: bool,
    done: bool,
}

async fn next_snapshot(
    mut sub: Subscription,
) -> Option<(Result<Vec<Document>, StoreError>, Subscription)> {
    if sub.done {
        return None;
    }

    if !sub.primed {
        sub.primed = true;
    } else {
        loop {
            match sub.listener.recv().await {
                Ok(notification) if notification.payload() == sub.collection => break,
                Ok(_) => continue,
                Err(e) => {
                    sub.done = true;
                    return Some((Err(StoreError::from(e)), sub));
                }
            }
        }
    }

    let result = query_documents(&sub.pool, &sub.collection, &sub.query).await;
    if result.is_err() {
        sub.done = true;
    }
    Some((result, sub))
}
