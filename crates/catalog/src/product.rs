use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, ProductId, VariantId};

/// Named attribute on a variant (e.g. `size = "XL"`, `color = "red"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub name: String,
    pub value: String,
}

/// A sellable/stockable variant of a product.
///
/// Inventory is tracked per variant, never per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub sku: String,
    pub attributes: Vec<AttributeValue>,
    pub price_cents: Option<i64>,
}

/// Input for adding a variant to a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    #[serde(default)]
    pub attributes: Vec<AttributeValue>,
    pub price_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub variants: Vec<Variant>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        description: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::field("name", "cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            description,
            variants: Vec::new(),
            active: true,
            created_at: at,
            updated_at: at,
        })
    }

    /// Add a variant. SKUs must be unique within the product.
    pub fn add_variant(&mut self, new: NewVariant, at: DateTime<Utc>) -> DomainResult<Variant> {
        if new.sku.trim().is_empty() {
            return Err(DomainError::field("sku", "cannot be empty"));
        }
        if let Some(price) = new.price_cents {
            if price < 0 {
                return Err(DomainError::field("price_cents", "cannot be negative"));
            }
        }
        if self.variants.iter().any(|v| v.sku == new.sku) {
            return Err(DomainError::conflict(format!(
                "sku '{}' already exists on this product",
                new.sku
            )));
        }

        let variant = Variant {
            id: VariantId::new(),
            sku: new.sku,
            attributes: new.attributes,
            price_cents: new.price_cents,
        };
        self.variants.push(variant.clone());
        self.updated_at = at;
        Ok(variant)
    }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn rename(&mut self, name: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::field("name", "cannot be empty"));
        }
        self.name = name;
        self.updated_at = at;
        Ok(())
    }

    /// Soft delete: the product stays addressable for history/audit.
    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product::new(ProductId::new(), "Trail Jacket", None, Utc::now()).unwrap()
    }

    fn variant(sku: &str) -> NewVariant {
        NewVariant {
            sku: sku.to_string(),
            attributes: vec![AttributeValue {
                name: "size".to_string(),
                value: "M".to_string(),
            }],
            price_cents: Some(12_900),
        }
    }

    #[test]
    fn add_variant_assigns_id_and_keeps_attributes() {
        let mut p = product();
        let v = p.add_variant(variant("JKT-M"), Utc::now()).unwrap();
        assert_eq!(v.sku, "JKT-M");
        assert_eq!(v.attributes[0].value, "M");
        assert_eq!(p.variant(v.id).unwrap().sku, "JKT-M");
    }

    #[test]
    fn duplicate_sku_is_a_conflict() {
        let mut p = product();
        p.add_variant(variant("JKT-M"), Utc::now()).unwrap();
        let err = p.add_variant(variant("JKT-M"), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Product::new(ProductId::new(), "  ", None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: Some(f), .. } if f == "name"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut p = product();
        let mut v = variant("JKT-S");
        v.price_cents = Some(-1);
        assert!(p.add_variant(v, Utc::now()).is_err());
    }

    #[test]
    fn deactivate_is_soft() {
        let mut p = product();
        p.deactivate(Utc::now());
        assert!(!p.active);
        assert_eq!(p.name, "Trail Jacket");
    }
}
