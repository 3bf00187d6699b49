use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{
    Company, NewCompany, NewProduct, NewUser, Product, ProductPatch, ProductWithCompany, Role,
    SearchResults, User,
};
use super::{MarketStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, Company>,
    products: HashMap<Uuid, Product>,
}

/// Volatile in-process store. Used for tests and database-less runs.
///
/// Unlike the Postgres backend there is no unique index behind
/// `create_company`; the one-company-per-user invariant rests entirely on the
/// caller's check-then-insert.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl MarketStore for MemStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_company(&self, user_id: Uuid, company: NewCompany) -> StoreResult<Company> {
        let mut inner = self.inner.write().await;
        let created = Company {
            id: Uuid::new_v4(),
            user_id,
            company_name: company.company_name,
            rut: company.rut,
            description: company.description,
            category: company.category,
            company_type: company.company_type,
            phone: company.phone,
            address: company.address,
            logo_url: company.logo_url,
            is_verified: false,
            view_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.companies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_company_by_user_id(&self, user_id: Uuid) -> StoreResult<Option<Company>> {
        let inner = self.inner.read().await;
        Ok(inner
            .companies
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn get_all_companies(&self) -> StoreResult<Vec<Company>> {
        let inner = self.inner.read().await;
        Ok(inner.companies.values().cloned().collect())
    }

    async fn get_company_by_id(&self, id: Uuid) -> StoreResult<Option<Company>> {
        let inner = self.inner.read().await;
        Ok(inner.companies.get(&id).cloned())
    }

    async fn create_product(
        &self,
        company_id: Option<Uuid>,
        user_id: Uuid,
        product: NewProduct,
        is_verified: bool,
    ) -> StoreResult<Product> {
        let mut inner = self.inner.write().await;
        let created = Product {
            id: Uuid::new_v4(),
            company_id,
            user_id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            images: product.images,
            status: "active".into(),
            is_verified,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_product_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.get(&id).cloned())
    }

    async fn get_products_by_company_id(&self, company_id: Uuid) -> StoreResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .filter(|p| p.company_id == Some(company_id))
            .cloned()
            .collect())
    }

    async fn get_products_by_user_id(&self, user_id: Uuid) -> StoreResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_all_products(&self) -> StoreResult<Vec<ProductWithCompany>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .map(|p| ProductWithCompany {
                product: p.clone(),
                company_name: p
                    .company_id
                    .and_then(|cid| inner.companies.get(&cid))
                    .map(|c| c.company_name.clone()),
            })
            .collect())
    }

    async fn update_product(
        &self,
        id: Uuid,
        company_id: Uuid,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        let mut inner = self.inner.write().await;
        match inner.products.get_mut(&id) {
            Some(p) if p.company_id == Some(company_id) => {
                apply_patch(p, patch);
                Ok(Some(p.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_product_by_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        let mut inner = self.inner.write().await;
        match inner.products.get_mut(&id) {
            Some(p) if p.user_id == user_id => {
                apply_patch(p, patch);
                Ok(Some(p.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_product(&self, id: Uuid, company_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let owned = matches!(
            inner.products.get(&id),
            Some(p) if p.company_id == Some(company_id)
        );
        if !owned {
            return Ok(false);
        }
        inner.products.remove(&id);
        Ok(true)
    }

    async fn delete_product_by_user(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let owned = matches!(inner.products.get(&id), Some(p) if p.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        inner.products.remove(&id);
        Ok(true)
    }

    async fn increment_company_views(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(company) = inner.companies.get_mut(&id) {
            company.view_count += 1;
        }
        Ok(())
    }

    async fn search_global(&self, query: &str) -> StoreResult<SearchResults> {
        let q = query.to_lowercase();
        let inner = self.inner.read().await;
        let companies = inner
            .companies
            .values()
            .filter(|c| contains_ci(&c.company_name, &q) || contains_ci(&c.category, &q))
            .cloned()
            .collect();
        let products = inner
            .products
            .values()
            .filter(|p| {
                contains_ci(&p.name, &q)
                    || p.category.as_deref().is_some_and(|c| contains_ci(c, &q))
            })
            .map(|p| ProductWithCompany {
                product: p.clone(),
                company_name: p
                    .company_id
                    .and_then(|cid| inner.companies.get(&cid))
                    .map(|c| c.company_name.clone()),
            })
            .collect();
        Ok(SearchResults {
            companies,
            products,
        })
    }
}

fn apply_patch(product: &mut Product, patch: ProductPatch) {
    if let Some(name) = patch.name {
        product.name = name;
    }
    if let Some(description) = patch.description {
        product.description = Some(description);
    }
    if let Some(price) = patch.price {
        product.price = Some(price);
    }
    if let Some(category) = patch.category {
        product.category = Some(category);
    }
    if let Some(images) = patch.images {
        product.images = images;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn company_fields(name: &str) -> NewCompany {
        NewCompany {
            company_name: name.into(),
            rut: "76.543.210-K".into(),
            description: Some("Relojería de confianza".into()),
            category: "Joyas".into(),
            company_type: "jewelry".into(),
            phone: "+56 9 1234 5678".into(),
            address: None,
            logo_url: None,
        }
    }

    fn product_fields(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: Some("Como nuevo".into()),
            price: Some(Decimal::new(10000, 0)),
            category: Some("Relojes".into()),
            images: vec!["a".into(), "b".into()],
        }
    }

    #[tokio::test]
    async fn company_roundtrip_by_owner() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let created = store
            .create_company(owner, company_fields("Joyas del Sur"))
            .await
            .unwrap();
        let fetched = store.get_company_by_user_id(owner).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(!fetched.is_verified);
        assert_eq!(fetched.view_count, 0);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemStore::new();
        let new_user = |role| NewUser {
            email: "ana@example.com".into(),
            name: "Ana".into(),
            password_hash: "x".into(),
            role,
        };
        store.create_user(new_user(Role::Buyer)).await.unwrap();
        let err = store.create_user(new_user(Role::Seller)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn partial_update_keeps_omitted_fields() {
        let store = MemStore::new();
        let user_id = Uuid::new_v4();
        let created = store
            .create_product(None, user_id, product_fields("Reloj"), false)
            .await
            .unwrap();

        let patch = ProductPatch {
            price: Some(Decimal::new(12000, 0)),
            ..Default::default()
        };
        let updated = store
            .update_product_by_user(created.id, user_id, patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.price, Some(Decimal::new(12000, 0)));
        assert_eq!(updated.name, "Reloj");
        assert_eq!(updated.description.as_deref(), Some("Como nuevo"));
        assert_eq!(updated.images, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn foreign_owner_indistinguishable_from_missing() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let created = store
            .create_product(None, owner, product_fields("Anillo"), false)
            .await
            .unwrap();

        let foreign = store
            .update_product_by_user(created.id, stranger, ProductPatch::default())
            .await
            .unwrap();
        let missing = store
            .update_product_by_user(Uuid::new_v4(), stranger, ProductPatch::default())
            .await
            .unwrap();
        assert!(foreign.is_none());
        assert!(missing.is_none());

        assert!(!store.delete_product_by_user(created.id, stranger).await.unwrap());
        // Still there for the real owner
        assert!(store.delete_product_by_user(created.id, owner).await.unwrap());
    }

    #[tokio::test]
    async fn company_scoped_ownership_checks_company_id() {
        let store = MemStore::new();
        let company_a = Uuid::new_v4();
        let company_b = Uuid::new_v4();
        let created = store
            .create_product(Some(company_a), Uuid::new_v4(), product_fields("Collar"), true)
            .await
            .unwrap();

        assert!(store
            .update_product(created.id, company_b, ProductPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_product(created.id, company_b).await.unwrap());
        assert!(store.delete_product(created.id, company_a).await.unwrap());
    }

    #[tokio::test]
    async fn images_roundtrip_preserves_order() {
        let store = MemStore::new();
        let user_id = Uuid::new_v4();
        let created = store
            .create_product(None, user_id, product_fields("Reloj"), false)
            .await
            .unwrap();
        let fetched = store.get_product_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.images, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn view_counter_increments() {
        let store = MemStore::new();
        let company = store
            .create_company(Uuid::new_v4(), company_fields("Vista SA"))
            .await
            .unwrap();
        for _ in 0..3 {
            store.increment_company_views(company.id).await.unwrap();
        }
        let fetched = store.get_company_by_id(company.id).await.unwrap().unwrap();
        assert_eq!(fetched.view_count, 3);
    }

    #[tokio::test]
    async fn increment_on_unknown_id_is_a_noop() {
        let store = MemStore::new();
        store.increment_company_views(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_joins_company_name() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let company = store
            .create_company(owner, company_fields("Joyas del Sur"))
            .await
            .unwrap();
        store
            .create_product(Some(company.id), owner, product_fields("Reloj Cartier"), true)
            .await
            .unwrap();

        let results = store.search_global("reloj").await.unwrap();
        assert_eq!(results.products.len(), 1);
        assert_eq!(
            results.products[0].company_name.as_deref(),
            Some("Joyas del Sur")
        );

        let by_category = store.search_global("joyas").await.unwrap();
        assert_eq!(by_category.companies.len(), 1);
    }

    #[tokio::test]
    async fn search_with_no_matches_returns_empty_sets() {
        let store = MemStore::new();
        store
            .create_product(None, Uuid::new_v4(), product_fields("Reloj"), false)
            .await
            .unwrap();
        let results = store.search_global("xy").await.unwrap();
        assert!(results.companies.is_empty());
        assert!(results.products.is_empty());
    }

    #[tokio::test]
    async fn all_products_carry_owning_company_name() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let company = store
            .create_company(owner, company_fields("Joyas del Sur"))
            .await
            .unwrap();
        store
            .create_product(Some(company.id), owner, product_fields("Collar"), true)
            .await
            .unwrap();
        store
            .create_product(None, Uuid::new_v4(), product_fields("Anillo"), false)
            .await
            .unwrap();

        let all = store.get_all_products().await.unwrap();
        assert_eq!(all.len(), 2);
        let named: Vec<_> = all.iter().filter(|p| p.company_name.is_some()).collect();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].company_name.as_deref(), Some("Joyas del Sur"));
    }
}
