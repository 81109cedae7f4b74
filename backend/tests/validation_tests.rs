//! Catalogue validation tests
//!
//! Tests for input rules including:
//! - Supplier CNPJ, phone and email formats
//! - Product category matching and name folding
//! - Movement input bounds

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::validation::{validate_cnpj, validate_password, validate_phone};
use shared::{fold, NewMovement, ProductCategory, SupplierCategory, SupplierDraft};
use validator::Validate;

fn supplier_json(cnpj: &str, phone: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "company_name": "Malharia Estrela",
        "cnpj": cnpj,
        "phone": phone,
        "address": "Rua das Flores, 120",
        "category": "TEC",
        "contact_name": "Joana",
        "email": email,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_valid_supplier() {
        let draft: SupplierDraft =
            serde_json::from_value(supplier_json("12.345.678/0001-95", "+5511987654321", "contato@estrela.com.br"))
                .unwrap();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.category, SupplierCategory::Fabrics);
        assert!(draft.is_active);
    }

    /// A blank email is accepted as no email
    #[test]
    fn test_blank_email_allowed() {
        let draft: SupplierDraft =
            serde_json::from_value(supplier_json("12.345.678/0001-95", "11987654321", "  ")).unwrap();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.email, None);
    }

    #[test]
    fn test_invalid_supplier_fields() {
        let bad_cnpj: SupplierDraft =
            serde_json::from_value(supplier_json("12345678000195", "11987654321", "")).unwrap();
        let errors = bad_cnpj.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cnpj"));

        let bad_phone: SupplierDraft =
            serde_json::from_value(supplier_json("12.345.678/0001-95", "(11) 98765-4321", "")).unwrap();
        let errors = bad_phone.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));

        let bad_email: SupplierDraft =
            serde_json::from_value(supplier_json("12.345.678/0001-95", "11987654321", "not-an-email")).unwrap();
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_supplier_category_codes() {
        let category: SupplierCategory = serde_json::from_str("\"SUB_TRANS\"").unwrap();
        assert_eq!(category, SupplierCategory::SublimationAndTransfer);
        assert_eq!(category.label(), "Sublimação e Transfer");
        assert!(serde_json::from_str::<SupplierCategory>("\"OTHER\"").is_err());
    }

    #[test]
    fn test_phone_lengths() {
        assert!(validate_phone("123456789").is_ok());
        assert!(validate_phone("12345678").is_err());
        assert!(validate_phone("+123456789012345").is_ok());
        assert!(validate_phone("1123456789012345").is_ok());
        assert!(validate_phone("2123456789012345").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("s3cretpass").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("1234567890").is_err());
    }

    /// Category labels match with or without accents
    #[test]
    fn test_product_category_lenient() {
        assert_eq!(ProductCategory::parse_lenient("SUBLIMAÇÃO"), Some(ProductCategory::Sublimacao));
        assert_eq!(ProductCategory::parse_lenient(" tecidos "), Some(ProductCategory::Tecidos));
        assert_eq!(ProductCategory::parse_lenient("Papelaria"), None);
    }

    #[test]
    fn test_movement_bounds() {
        let movement: NewMovement = serde_json::from_value(serde_json::json!({
            "product_id": "6f1c2a4e-8b7d-4c1a-9e2f-3a5b7c9d1e0f",
            "direction": "EXIT",
            "quantity": 0,
        }))
        .unwrap();
        assert!(movement.validate().is_err());

        let movement = NewMovement {
            quantity: 2,
            unit_price: Some(Decimal::ZERO),
            ..movement
        };
        assert!(movement.validate().is_err());

        let movement = NewMovement {
            unit_price: None,
            ..movement
        };
        assert!(movement.validate().is_ok());
    }

    #[test]
    fn test_fold_examples() {
        assert_eq!(fold("Camiseta Algodão"), "camiseta algodao");
        assert_eq!(fold("ÁGUA"), "agua");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Generate CNPJs in the printed layout
    fn cnpj_strategy() -> impl Strategy<Value = String> {
        "[0-9]{2}\\.[0-9]{3}\\.[0-9]{3}/[0-9]{4}-[0-9]{2}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_formatted_cnpj_valid(cnpj in cnpj_strategy()) {
            prop_assert!(validate_cnpj(&cnpj).is_ok());
        }

        /// Bare digit strings lack the separators
        #[test]
        fn prop_unformatted_cnpj_invalid(digits in "[0-9]{14}") {
            prop_assert!(validate_cnpj(&digits).is_err());
        }

        #[test]
        fn prop_digit_phones_valid(phone in "\\+?[0-9]{9,15}") {
            prop_assert!(validate_phone(&phone).is_ok());
        }

        /// Folding is idempotent
        #[test]
        fn prop_fold_idempotent(text in "[A-Za-zÀ-ÿ0-9 .,-]{0,40}") {
            let once = fold(&text);
            prop_assert_eq!(fold(&once), once);
        }

        /// Folded text never carries uppercase ASCII
        #[test]
        fn prop_fold_lowercases(text in "[A-Za-zÀ-ÿ ]{0,40}") {
            let folded = fold(&text);
            prop_assert!(!folded.chars().any(|c| c.is_ascii_uppercase()));
        }
    }
}
