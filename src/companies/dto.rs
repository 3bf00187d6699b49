use serde::{Deserialize, Serialize};

use crate::auth::dto::PublicUser;
use crate::error::{ApiError, FieldErrors};
use crate::store::{Company, NewCompany, Product};

pub const COMPANY_TYPES: &[&str] = &[
    "retailer",
    "verifier",
    "dealer",
    "real_estate",
    "electronics",
    "jewelry",
    "other",
];

/// Company fields submitted by a signed-in user registering their company.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyRequest {
    pub company_name: String,
    pub rut: String,
    pub description: Option<String>,
    /// Comma-joinable list of category names in one text field.
    pub category: String,
    pub company_type: String,
    pub phone: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}

impl RegisterCompanyRequest {
    pub fn validate(self) -> Result<NewCompany, ApiError> {
        let mut errors = FieldErrors::new();
        if self.company_name.trim().is_empty() {
            errors
                .entry("companyName")
                .or_default()
                .push("Nombre de empresa requerido".into());
        }
        if self.rut.trim().is_empty() {
            errors.entry("rut").or_default().push("RUT requerido".into());
        }
        if self.category.trim().is_empty() {
            errors
                .entry("category")
                .or_default()
                .push("Categoría requerida".into());
        }
        if !COMPANY_TYPES.contains(&self.company_type.as_str()) {
            errors
                .entry("companyType")
                .or_default()
                .push("Tipo de empresa inválido".into());
        }
        if self.phone.trim().is_empty() {
            errors
                .entry("phone")
                .or_default()
                .push("Teléfono requerido".into());
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewCompany {
            company_name: self.company_name,
            rut: self.rut,
            description: self.description.filter(|d| !d.is_empty()),
            category: self.category,
            company_type: self.company_type,
            phone: self.phone,
            address: self.address.filter(|a| !a.is_empty()),
            logo_url: self.logo_url.filter(|u| !u.is_empty()),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyResponse {
    pub company: Company,
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Detail-page payload: the company plus its catalog.
#[derive(Debug, Serialize)]
pub struct CompanyDetail {
    pub company: Company,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterCompanyRequest {
        RegisterCompanyRequest {
            company_name: "Joyas del Sur".into(),
            rut: "76.543.210-K".into(),
            description: None,
            category: "Joyas".into(),
            company_type: "jewelry".into(),
            phone: "+56 9 1234 5678".into(),
            address: None,
            logo_url: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn unknown_company_type_is_rejected() {
        let mut bad = request();
        bad.company_type = "spaceship".into();
        let err = bad.validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("companyType")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_optionals_become_none() {
        let mut with_blank = request();
        with_blank.description = Some(String::new());
        let fields = with_blank.validate().unwrap();
        assert!(fields.description.is_none());
    }
}
