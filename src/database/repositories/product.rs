use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{ProductRepository, RepoError, RepoResult, Repository};
use crate::models::query::effective_sort;
use crate::models::{
    LOW_STOCK_THRESHOLD, Product, ProductCursorPage, ProductCursorQuery, ProductFilter,
    ProductPage, ProductQuery, ProductStats, SortDirection, SortSpec,
};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, user_id, created_at, updated_at";

/// Postgres product store.
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Owner scope plus every populated filter, all as bound parameters.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &ProductFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);

    if let Some(name) = &filter.name {
        qb.push(" AND LOWER(name) LIKE ")
            .push_bind(format!("%{}%", name.to_lowercase()));
    }
    if let Some(min_price) = filter.min_price {
        qb.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        qb.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(min_stock) = filter.min_stock {
        qb.push(" AND stock >= ").push_bind(min_stock);
    }
    if let Some(max_stock) = filter.max_stock {
        qb.push(" AND stock <= ").push_bind(max_stock);
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(from) = filter.updated_from {
        qb.push(" AND updated_at >= ").push_bind(from);
    }
    if let Some(to) = filter.updated_to {
        qb.push(" AND updated_at <= ").push_bind(to);
    }
}

// Column names come from the SortField allow-list, never from user input.
fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &[SortSpec]) {
    qb.push(" ORDER BY ");
    let mut columns = qb.separated(", ");
    for spec in effective_sort(sort) {
        columns.push(format!("{} {}", spec.field.column(), spec.direction.keyword()));
    }
    columns.push("id ASC");
}

fn push_cursor_value(
    qb: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    user_id: Uuid,
    cursor: Uuid,
) {
    qb.push(format!("(SELECT {column} FROM products WHERE id = "))
        .push_bind(cursor)
        .push(" AND user_id = ")
        .push_bind(user_id)
        .push(")");
}

/// Restricts to rows strictly after the cursor row in `push_order`'s order,
/// expanded as `(k1 after c1) OR (k1 = c1 AND k2 after c2) OR ... OR
/// (all equal AND id > cursor)`. The cursor's key values are read through
/// owner-scoped subqueries, so an unknown or foreign cursor matches nothing.
fn push_after_cursor(
    qb: &mut QueryBuilder<'_, Postgres>,
    user_id: Uuid,
    cursor: Uuid,
    sort: &[SortSpec],
) {
    let order = effective_sort(sort);

    qb.push(" AND (");
    for depth in 0..=order.len() {
        if depth > 0 {
            qb.push(" OR ");
        }
        qb.push("(");
        for spec in &order[..depth] {
            let column = spec.field.column();
            qb.push(format!("{column} = "));
            push_cursor_value(qb, column, user_id, cursor);
            qb.push(" AND ");
        }
        match order.get(depth) {
            Some(spec) => {
                let column = spec.field.column();
                let op = match spec.direction {
                    SortDirection::Asc => ">",
                    SortDirection::Desc => "<",
                };
                qb.push(format!("{column} {op} "));
                push_cursor_value(qb, column, user_id, cursor);
            }
            None => {
                qb.push("id > ");
                push_cursor_value(qb, "id", user_id, cursor);
            }
        }
        qb.push(")");
    }
    qb.push(")");
}

#[async_trait]
impl Repository<Product> for PgProductRepository {
    async fn create(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.user_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn update(&self, product: &Product) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn get_by_user_id(&self, user_id: Uuid) -> RepoResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 ORDER BY created_at DESC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn find_filtered(&self, user_id: Uuid, query: &ProductQuery) -> RepoResult<ProductPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_scope(&mut count, user_id, &query.filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_scope(&mut select, user_id, &query.filter);
        push_order(&mut select, &query.sort);
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.pagination.page_size))
            .push(" OFFSET ")
            .push_bind(query.pagination.offset() as i64);

        let products = select
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(ProductPage::new(products, total, query.pagination))
    }

    async fn find_with_cursor(
        &self,
        user_id: Uuid,
        query: &ProductCursorQuery,
    ) -> RepoResult<ProductCursorPage> {
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_scope(&mut select, user_id, &query.filter);
        if let Some(cursor) = query.pagination.cursor {
            push_after_cursor(&mut select, user_id, cursor, &query.sort);
        }
        push_order(&mut select, &query.sort);
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.pagination.page_size) + 1);

        let rows = select
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(ProductCursorPage::from_rows(rows, query.pagination))
    }

    async fn stats(&self, user_id: Uuid) -> RepoResult<ProductStats> {
        let stats = sqlx::query_as::<_, ProductStats>(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(price * stock), 0)::FLOAT8 AS total_value,
                COALESCE(AVG(price), 0)::FLOAT8 AS avg_price,
                COUNT(*) FILTER (WHERE stock < $2) AS low_stock,
                COUNT(*) FILTER (WHERE stock = 0) AS out_of_stock
            FROM products
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_predicate_follows_sort_order() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM products WHERE TRUE");
        let sort = vec![
            SortSpec::parse("price", Some("desc")).unwrap(),
            SortSpec::parse("name", None).unwrap(),
        ];
        push_after_cursor(&mut qb, Uuid::new_v4(), Uuid::new_v4(), &sort);
        let sql = qb.sql();

        assert!(sql.contains("(price < (SELECT price FROM products WHERE id = $1 AND user_id = $2))"));
        assert!(sql.contains("price = (SELECT price FROM products WHERE id = $3 AND user_id = $4) AND name > (SELECT name"));
        assert!(sql.contains("name = (SELECT name FROM products WHERE id = $9 AND user_id = $10) AND id > (SELECT id FROM products WHERE id = $11"));
        assert!(sql.ends_with(")))"));
    }

    #[test]
    fn test_cursor_predicate_defaults_to_newest_first() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM products WHERE TRUE");
        push_after_cursor(&mut qb, Uuid::new_v4(), Uuid::new_v4(), &[]);

        assert!(qb.sql().contains("(created_at < (SELECT created_at FROM products"));
        assert!(qb.sql().contains("AND id > (SELECT id FROM products"));
    }
}
