use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
mod types;

pub use memory::MemStore;
pub use postgres::PgStore;
pub use types::{
    Company, NewCompany, NewProduct, NewUser, Product, ProductPatch, ProductWithCompany, Role,
    SearchResults, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint violation (email or one-company-per-user).
    #[error("duplicate row")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Data-access contract over users, companies and products.
///
/// Two implementations exist: [`PgStore`] (sqlx/Postgres, selected when
/// `DATABASE_URL` is set) and [`MemStore`] (plain maps, for tests and
/// database-less runs). Ownership-scoped mutations report a missing row and a
/// foreign row identically, so callers cannot leak existence.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>>;

    /// No duplicate check happens inside this call; callers gate on
    /// [`get_company_by_user_id`](Self::get_company_by_user_id) first, and the
    /// Postgres backend additionally holds a unique index on `user_id`.
    async fn create_company(&self, user_id: Uuid, company: NewCompany) -> StoreResult<Company>;
    async fn get_company_by_user_id(&self, user_id: Uuid) -> StoreResult<Option<Company>>;
    async fn get_all_companies(&self) -> StoreResult<Vec<Company>>;
    async fn get_company_by_id(&self, id: Uuid) -> StoreResult<Option<Company>>;

    /// The verified flag is supplied by the caller, not derived here.
    async fn create_product(
        &self,
        company_id: Option<Uuid>,
        user_id: Uuid,
        product: NewProduct,
        is_verified: bool,
    ) -> StoreResult<Product>;
    async fn get_product_by_id(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn get_products_by_company_id(&self, company_id: Uuid) -> StoreResult<Vec<Product>>;
    async fn get_products_by_user_id(&self, user_id: Uuid) -> StoreResult<Vec<Product>>;
    async fn get_all_products(&self) -> StoreResult<Vec<ProductWithCompany>>;

    async fn update_product(
        &self,
        id: Uuid,
        company_id: Uuid,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>>;
    async fn update_product_by_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>>;
    async fn delete_product(&self, id: Uuid, company_id: Uuid) -> StoreResult<bool>;
    async fn delete_product_by_user(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    async fn increment_company_views(&self, id: Uuid) -> StoreResult<()>;

    /// Case-insensitive substring match over company name/category and product
    /// name/category. Minimum query length is enforced at the route layer.
    async fn search_global(&self, query: &str) -> StoreResult<SearchResults>;
}
