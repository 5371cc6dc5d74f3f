//! Generic MySQL entity store.

use super::SqlModel;
use crate::{traits::EntityStore, DatabasePoolInterface};
use async_trait::async_trait;
use pagecache_core::{ColumnValue, ListQuery, PageCacheError, PageCacheResult};
use sqlx::{MySql, QueryBuilder};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// MySQL-backed [`EntityStore`] for any [`SqlModel`].
pub struct MySqlEntityStore<T> {
    pool: Arc<dyn DatabasePoolInterface>,
    _model: PhantomData<fn() -> T>,
}

impl<T: SqlModel> MySqlEntityStore<T> {
    /// Creates a store over the given pool.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self {
            pool,
            _model: PhantomData,
        }
    }

    fn select(&self) -> QueryBuilder<'static, MySql> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE 1 = 1",
            T::select_list(),
            T::TABLE
        ));
        push_live_filter::<T>(&mut qb);
        qb
    }

    async fn find_by_natural_key(&self, entity: &T) -> PageCacheResult<Option<T>> {
        if T::NATURAL_KEY.is_empty() {
            return Ok(None);
        }
        let mut qb = self.select();
        for column in T::NATURAL_KEY {
            T::check_column(column)?;
            push_condition(&mut qb, column, entity.column_value(column)?);
        }
        qb.push(" LIMIT 1");

        let row = qb
            .build_query_as::<T>()
            .fetch_optional(self.pool.inner())
            .await?;
        Ok(row)
    }

    async fn insert(&self, entity: &T) -> PageCacheResult<T> {
        let mut qb: QueryBuilder<'static, MySql> =
            QueryBuilder::new(format!("INSERT INTO {} (", T::TABLE));
        qb.push(T::COLUMNS.join(", "));
        qb.push(") VALUES (");
        {
            let mut values = qb.separated(", ");
            for column in T::COLUMNS {
                match entity.column_value(column)? {
                    ColumnValue::Null => values.push_bind(None::<String>),
                    ColumnValue::Bool(v) => values.push_bind(v),
                    ColumnValue::Int(v) => values.push_bind(v),
                    ColumnValue::Float(v) => values.push_bind(v),
                    ColumnValue::Text(v) => values.push_bind(v),
                    ColumnValue::Timestamp(v) => values.push_bind(v),
                };
            }
        }
        qb.push(")");

        let result = qb.build().execute(self.pool.inner()).await?;
        let id = i64::try_from(result.last_insert_id())
            .map_err(|e| PageCacheError::internal(format!("Insert id out of range: {}", e)))?;

        let mut created = entity.clone();
        created.set_id(id);
        Ok(created)
    }
}

impl<T> Clone for MySqlEntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            _model: PhantomData,
        }
    }
}

impl<T: SqlModel> std::fmt::Debug for MySqlEntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlEntityStore")
            .field("table", &T::TABLE)
            .finish_non_exhaustive()
    }
}

/// Binds a column value onto the builder.
pub(crate) fn push_bind_value(qb: &mut QueryBuilder<'static, MySql>, value: ColumnValue) {
    match value {
        ColumnValue::Null => qb.push_bind(None::<String>),
        ColumnValue::Bool(v) => qb.push_bind(v),
        ColumnValue::Int(v) => qb.push_bind(v),
        ColumnValue::Float(v) => qb.push_bind(v),
        ColumnValue::Text(v) => qb.push_bind(v),
        ColumnValue::Timestamp(v) => qb.push_bind(v),
    };
}

fn push_condition(qb: &mut QueryBuilder<'static, MySql>, column: &str, value: ColumnValue) {
    qb.push(format!(" AND {}", column));
    if value.is_null() {
        qb.push(" IS NULL");
    } else {
        qb.push(" = ");
        push_bind_value(qb, value);
    }
}

fn push_live_filter<T: SqlModel>(qb: &mut QueryBuilder<'static, MySql>) {
    if let Some(column) = T::SOFT_DELETE {
        qb.push(format!(" AND {} IS NULL", column));
    }
}

#[async_trait]
impl<T: SqlModel> EntityStore<T> for MySqlEntityStore<T> {
    async fn find_by_id(&self, id: i64) -> PageCacheResult<Option<T>> {
        debug!("Finding {} by id: {}", T::TABLE, id);

        let mut qb = self.select();
        qb.push(" AND id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<T>()
            .fetch_optional(self.pool.inner())
            .await?;
        Ok(row)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> PageCacheResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Finding {} {} rows by id", ids.len(), T::TABLE);

        let mut qb = self.select();
        qb.push(" AND id IN (");
        {
            let mut list = qb.separated(", ");
            for id in ids {
                list.push_bind(*id);
            }
        }
        qb.push(")");

        let rows = qb
            .build_query_as::<T>()
            .fetch_all(self.pool.inner())
            .await?;
        Ok(rows)
    }

    async fn pluck_ids(&self, query: &ListQuery) -> PageCacheResult<Vec<i64>> {
        T::check_query(query)?;
        debug!("Plucking {} ids: {:?}", T::TABLE, query);

        let mut qb: QueryBuilder<'static, MySql> =
            QueryBuilder::new(format!("SELECT id FROM {} WHERE 1 = 1", T::TABLE));
        push_live_filter::<T>(&mut qb);
        for filter in query.filters() {
            push_condition(&mut qb, &filter.column, filter.value.clone());
        }

        let mut terms: Vec<String> = query
            .orders()
            .iter()
            .map(|o| format!("{} {}", o.column, o.direction.as_sql()))
            .collect();
        if !query.orders().iter().any(|o| o.column == "id") {
            terms.push("id ASC".to_string());
        }
        qb.push(" ORDER BY ");
        qb.push(terms.join(", "));

        let ids = qb
            .build_query_scalar::<i64>()
            .fetch_all(self.pool.inner())
            .await?;
        Ok(ids)
    }

    async fn first_or_create(&self, entity: &T) -> PageCacheResult<T> {
        if entity.id() != 0 {
            if let Some(existing) = self.find_by_id(entity.id()).await? {
                return Ok(existing);
            }
        }
        if let Some(existing) = self.find_by_natural_key(entity).await? {
            debug!("{} already exists with id {}", T::TABLE, existing.id());
            return Ok(existing);
        }

        match self.insert(entity).await {
            Ok(created) => {
                debug!("Created {} {}", T::TABLE, created.id());
                Ok(created)
            }
            // lost a race against a concurrent insert of the same natural key
            Err(PageCacheError::Conflict(msg)) => self
                .find_by_natural_key(entity)
                .await?
                .ok_or(PageCacheError::Conflict(msg)),
            Err(e) => Err(e),
        }
    }

    async fn update_columns(&self, entity: &T, columns: &[&str]) -> PageCacheResult<()> {
        if columns.is_empty() {
            return Ok(());
        }
        for column in columns {
            T::check_column(column)?;
            if *column == "id" {
                return Err(PageCacheError::validation("Cannot update column 'id'"));
            }
        }
        debug!("Updating {} {} columns {:?}", T::TABLE, entity.id(), columns);

        let mut qb: QueryBuilder<'static, MySql> =
            QueryBuilder::new(format!("UPDATE {} SET ", T::TABLE));
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(format!("{} = ", column));
            push_bind_value(&mut qb, entity.column_value(column)?);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(entity.id());
        push_live_filter::<T>(&mut qb);

        qb.build().execute(self.pool.inner()).await?;
        Ok(())
    }

    async fn delete(&self, entity: &T) -> PageCacheResult<bool> {
        debug!("Deleting {} {}", T::TABLE, entity.id());

        let mut qb: QueryBuilder<'static, MySql> = match T::SOFT_DELETE {
            Some(column) => {
                let mut qb = QueryBuilder::new(format!("UPDATE {} SET {} = ", T::TABLE, column));
                qb.push_bind(chrono::Utc::now());
                qb.push(" WHERE 1 = 1");
                qb
            }
            None => QueryBuilder::new(format!("DELETE FROM {} WHERE 1 = 1", T::TABLE)),
        };
        qb.push(" AND id = ");
        qb.push_bind(entity.id());
        push_live_filter::<T>(&mut qb);

        let result = qb.build().execute(self.pool.inner()).await?;
        Ok(result.rows_affected() > 0)
    }
}
