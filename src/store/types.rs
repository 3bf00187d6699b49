use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization claim attached to a user. Stored and compared as an opaque
/// lowercase string in the database and in JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }

    /// Unknown values degrade to the least-privileged role.
    pub fn from_db(value: &str) -> Role {
        match value {
            "seller" => Role::Seller,
            _ => Role::Buyer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub rut: String,
    pub description: Option<String>,
    pub category: String,
    pub company_type: String,
    pub phone: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    /// Marketing/trust signal. Defaults false; only an external mutation
    /// (manual review) sets it, and no endpoint does so today.
    pub is_verified: bool,
    pub view_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub company_name: String,
    pub rut: String,
    pub description: Option<String>,
    pub category: String,
    pub company_type: String,
    pub phone: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    /// Null when the seller had no registered company at creation time.
    pub company_id: Option<Uuid>,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub status: String,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub images: Vec<String>,
}

/// Partial update. `None` means "leave the stored value alone".
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Product joined with its owning company's display name, for listing pages.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithCompany {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: Product,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub companies: Vec<Company>,
    pub products: Vec<ProductWithCompany>,
}
