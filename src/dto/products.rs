use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::Product;

/// Full product payload, used for both create and update.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_product_metrics"))]
pub struct ProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Product type is required"))]
    pub product_type: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub eco_score: Option<Decimal>,
    pub footprint: Option<Decimal>,
    pub material_co2: Option<Decimal>,
    pub shipping_co2: Option<Decimal>,
    pub image: Option<String>,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
    pub status: Option<String>,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_product_metrics(req: &ProductRequest) -> Result<(), ValidationError> {
    if req.price <= Decimal::ZERO {
        return Err(invalid("price", "Price must be greater than 0"));
    }
    if let Some(eco) = req.eco_score {
        if eco < Decimal::ZERO || eco > Decimal::from(5) {
            return Err(invalid("eco_score", "Eco score must be between 0 and 5"));
        }
    }
    let non_negative = [
        (req.footprint, "footprint", "Footprint cannot be negative"),
        (req.material_co2, "material_co2", "Material CO2 cannot be negative"),
        (req.shipping_co2, "shipping_co2", "Shipping CO2 cannot be negative"),
    ];
    for (value, code, message) in non_negative {
        if value.is_some_and(|v| v < Decimal::ZERO) {
            return Err(invalid(code, message));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockUpdateRequest {
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RatingUpdateRequest {
    pub rating: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductTypeList {
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> ProductRequest {
        ProductRequest {
            name: "Bamboo Toothbrush".into(),
            product_type: "Personal Care".into(),
            description: None,
            price: dec!(4.99),
            eco_score: Some(dec!(4.5)),
            footprint: Some(dec!(0.20)),
            material_co2: Some(dec!(0.10)),
            shipping_co2: Some(dec!(0.05)),
            image: None,
            stock_quantity: 10,
            status: None,
        }
    }

    #[test]
    fn accepts_well_formed_product() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut req = request();
        req.price = Decimal::ZERO;
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_eco_score_out_of_range() {
        let mut req = request();
        req.eco_score = Some(dec!(5.1));
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_negative_co2_and_stock() {
        let mut req = request();
        req.shipping_co2 = Some(dec!(-0.01));
        assert!(req.validate().is_err());

        let mut req = request();
        req.stock_quantity = -1;
        assert!(req.validate().is_err());
    }
}
