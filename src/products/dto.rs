use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ApiError, FieldErrors};
use crate::store::{NewProduct, ProductPatch};

fn parse_price(raw: &str, errors: &mut FieldErrors) -> Option<Decimal> {
    match raw.trim().parse::<Decimal>() {
        Ok(price) => Some(price),
        Err(_) => {
            errors.entry("price").or_default().push("Precio inválido".into());
            None
        }
    }
}

/// Product submission. The price arrives as a display string and is converted
/// to a fixed-point decimal at this boundary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateProductRequest {
    pub fn validate(self) -> Result<NewProduct, ApiError> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.entry("name").or_default().push("Nombre requerido".into());
        }
        let price = self
            .price
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .and_then(|p| parse_price(p, &mut errors));
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewProduct {
            name: self.name,
            description: self.description.filter(|d| !d.is_empty()),
            price,
            category: self.category.filter(|c| !c.is_empty()),
            images: self.images,
        })
    }
}

/// Partial update; omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> Result<ProductPatch, ApiError> {
        let mut errors = FieldErrors::new();
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.entry("name").or_default().push("Nombre requerido".into());
        }
        let price = self
            .price
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .and_then(|p| parse_price(p, &mut errors));
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(ProductPatch {
            name: self.name,
            description: self.description,
            price,
            category: self.category,
            images: self.images,
        })
    }
}
