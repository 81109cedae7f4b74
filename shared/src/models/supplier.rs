//! Supplier models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_cnpj, validate_phone};

/// Supplier category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "supplier_category"))]
pub enum SupplierCategory {
    #[serde(rename = "SUB_TRANS")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SUB_TRANS"))]
    SublimationAndTransfer,
    #[serde(rename = "SUB")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SUB"))]
    Sublimation,
    #[serde(rename = "TRANS")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TRANS"))]
    Transfer,
    #[serde(rename = "TEC")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TEC"))]
    Fabrics,
    #[default]
    #[serde(rename = "GERAL")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "GERAL"))]
    General,
}

impl SupplierCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SupplierCategory::SublimationAndTransfer => "Sublimação e Transfer",
            SupplierCategory::Sublimation => "Sublimação",
            SupplierCategory::Transfer => "Transfer",
            SupplierCategory::Fabrics => "Tecidos",
            SupplierCategory::General => "Todos",
        }
    }
}

/// A supplier of products
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: Uuid,
    pub company_name: String,
    pub cnpj: String,
    pub phone: String,
    pub address: String,
    pub category: SupplierCategory,
    pub contact_name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Values needed to write a supplier row
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SupplierDraft {
    #[validate(length(min = 1, max = 100, message = "Company name must be 1-100 characters"))]
    pub company_name: String,
    #[validate(custom = "validate_cnpj")]
    pub cnpj: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[serde(default)]
    pub category: SupplierCategory,
    #[validate(length(min = 1, max = 100, message = "Contact name must be 1-100 characters"))]
    pub contact_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl SupplierDraft {
    /// Treat a blank email as absent
    pub fn normalized(mut self) -> Self {
        if self.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            self.email = None;
        }
        self
    }
}

/// Partial supplier update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierPatch {
    pub company_name: Option<String>,
    pub cnpj: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<SupplierCategory>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl SupplierPatch {
    /// Merge into the stored supplier; the result is validated as a whole
    pub fn merge(self, existing: &Supplier) -> SupplierDraft {
        SupplierDraft {
            company_name: self.company_name.unwrap_or_else(|| existing.company_name.clone()),
            cnpj: self.cnpj.unwrap_or_else(|| existing.cnpj.clone()),
            phone: self.phone.unwrap_or_else(|| existing.phone.clone()),
            address: self.address.unwrap_or_else(|| existing.address.clone()),
            category: self.category.unwrap_or(existing.category),
            contact_name: self.contact_name.unwrap_or_else(|| existing.contact_name.clone()),
            email: self.email.or_else(|| existing.email.clone()),
            is_active: self.is_active.unwrap_or(existing.is_active),
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> SupplierDraft {
        SupplierDraft {
            company_name: "Malharia Paulista LTDA".to_string(),
            cnpj: "12.345.678/0001-95".to_string(),
            phone: "11987654321".to_string(),
            address: "Rua das Tecelãs, 100 - São Paulo".to_string(),
            category: SupplierCategory::Fabrics,
            contact_name: "Joana".to_string(),
            email: Some("compras@malharia.com.br".to_string()),
            is_active: true,
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_invalid_fields_reported() {
        let mut d = draft();
        d.cnpj = "12345678000195".to_string();
        d.phone = "abc".to_string();
        d.email = Some("not-an-email".to_string());

        let errors = d.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("cnpj"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_blank_email_is_absent() {
        let mut d = draft();
        d.email = Some("  ".to_string());
        let d = d.normalized();
        assert_eq!(d.email, None);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_blank_email_deserializes_as_none() {
        let d: SupplierDraft = serde_json::from_value(serde_json::json!({
            "company_name": "Transfer Sul",
            "cnpj": "98.765.432/0001-10",
            "phone": "+5551999998888",
            "address": "Av. Ipiranga, 500",
            "contact_name": "Paulo",
            "email": ""
        }))
        .unwrap();
        assert_eq!(d.email, None);
        assert_eq!(d.category, SupplierCategory::General);
        assert!(d.is_active);
    }

    #[test]
    fn test_category_wire_codes() {
        assert_eq!(
            serde_json::to_value(SupplierCategory::SublimationAndTransfer).unwrap(),
            "SUB_TRANS"
        );
        let cat: SupplierCategory = serde_json::from_str("\"TEC\"").unwrap();
        assert_eq!(cat, SupplierCategory::Fabrics);
        assert_eq!(SupplierCategory::default(), SupplierCategory::General);
    }
}
