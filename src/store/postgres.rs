use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{
    Company, NewCompany, NewProduct, NewUser, Product, ProductPatch, ProductWithCompany, Role,
    SearchResults, User,
};
use super::{MarketStore, StoreError, StoreResult};

/// sqlx/Postgres-backed store. Driver errors propagate untyped to the 500
/// path; only unique violations are classified, as [`StoreError::Duplicate`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw user row; `role` comes back as the TEXT column it is stored in.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: Role::from_db(&row.role),
            created_at: row.created_at,
        }
    }
}

fn map_db_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(err),
    }
}

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at";
const COMPANY_COLUMNS: &str = "id, user_id, company_name, rut, description, category, \
     company_type, phone, address, logo_url, is_verified, view_count, created_at";
const PRODUCT_COLUMNS: &str = "id, company_id, user_id, name, description, price, category, \
     images, status, is_verified, created_at";

#[async_trait]
impl MarketStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.into())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET role = $2
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create_company(&self, user_id: Uuid, company: NewCompany) -> StoreResult<Company> {
        let row = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies
                (user_id, company_name, rut, description, category, company_type,
                 phone, address, logo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&company.company_name)
        .bind(&company.rut)
        .bind(&company.description)
        .bind(&company.category)
        .bind(&company.company_type)
        .bind(&company.phone)
        .bind(&company.address)
        .bind(&company.logo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row)
    }

    async fn get_company_by_user_id(&self, user_id: Uuid) -> StoreResult<Option<Company>> {
        let row = sqlx::query_as::<_, Company>(&format!(
            r#"SELECT {COMPANY_COLUMNS} FROM companies WHERE user_id = $1"#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_all_companies(&self) -> StoreResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, Company>(&format!(
            r#"SELECT {COMPANY_COLUMNS} FROM companies ORDER BY created_at DESC"#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_company_by_id(&self, id: Uuid) -> StoreResult<Option<Company>> {
        let row = sqlx::query_as::<_, Company>(&format!(
            r#"SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_product(
        &self,
        company_id: Option<Uuid>,
        user_id: Uuid,
        product: NewProduct,
        is_verified: bool,
    ) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products
                (company_id, user_id, name, description, price, category, images,
                 status, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(user_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.images)
        .bind(is_verified)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_product_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_products_by_company_id(&self, company_id: Uuid) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM products WHERE company_id = $1
               ORDER BY created_at DESC"#
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_products_by_user_id(&self, user_id: Uuid) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1
               ORDER BY created_at DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_all_products(&self) -> StoreResult<Vec<ProductWithCompany>> {
        let rows = sqlx::query_as::<_, ProductWithCompany>(
            r#"
            SELECT p.*, c.company_name
            FROM products p
            LEFT JOIN companies c ON c.id = p.company_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_product(
        &self,
        id: Uuid,
        company_id: Uuid,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        // Re-fetch and compare the stored owner before writing; a foreign row
        // is reported exactly like a missing one.
        let existing = self.get_product_by_id(id).await?;
        match existing {
            Some(p) if p.company_id == Some(company_id) => {}
            _ => return Ok(None),
        }
        self.apply_patch(id, patch).await.map(Some)
    }

    async fn update_product_by_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        let existing = self.get_product_by_id(id).await?;
        match existing {
            Some(p) if p.user_id == user_id => {}
            _ => return Ok(None),
        }
        self.apply_patch(id, patch).await.map(Some)
    }

    async fn delete_product(&self, id: Uuid, company_id: Uuid) -> StoreResult<bool> {
        let existing = self.get_product_by_id(id).await?;
        match existing {
            Some(p) if p.company_id == Some(company_id) => {}
            _ => return Ok(false),
        }
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn delete_product_by_user(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let existing = self.get_product_by_id(id).await?;
        match existing {
            Some(p) if p.user_id == user_id => {}
            _ => return Ok(false),
        }
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn increment_company_views(&self, id: Uuid) -> StoreResult<()> {
        // Single atomic expression; no read-modify-write race under
        // concurrent detail-page fetches.
        sqlx::query("UPDATE companies SET view_count = COALESCE(view_count, 0) + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search_global(&self, query: &str) -> StoreResult<SearchResults> {
        let pattern = format!("%{query}%");
        let companies = sqlx::query_as::<_, Company>(&format!(
            r#"SELECT {COMPANY_COLUMNS} FROM companies
               WHERE company_name ILIKE $1 OR category ILIKE $1"#
        ))
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let products = sqlx::query_as::<_, ProductWithCompany>(
            r#"
            SELECT p.*, c.company_name
            FROM products p
            LEFT JOIN companies c ON c.id = p.company_id
            WHERE p.name ILIKE $1 OR p.category ILIKE $1 OR c.company_name ILIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(SearchResults {
            companies,
            products,
        })
    }
}

impl PgStore {
    /// `None` patch fields keep the stored value via COALESCE.
    async fn apply_patch(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                images = COALESCE($6, images)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.price)
        .bind(patch.category)
        .bind(patch.images)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
