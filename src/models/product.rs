use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
}

impl Product {
    pub fn new(user_id: Uuid, input: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        self.updated_at = Utc::now();
    }
}

/// Per-user aggregate figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProductStats {
    pub total_products: i64,
    pub total_value: f64,
    pub avg_price: f64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

/// Stock below this counts towards `low_stock`.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

impl ProductStats {
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        let mut stats = ProductStats::default();
        let mut price_sum = 0.0;
        for product in products {
            stats.total_products += 1;
            stats.total_value += product.price * f64::from(product.stock);
            price_sum += product.price;
            if product.stock < LOW_STOCK_THRESHOLD {
                stats.low_stock += 1;
            }
            if product.stock == 0 {
                stats.out_of_stock += 1;
            }
        }
        if stats.total_products > 0 {
            stats.avg_price = price_sum / stats.total_products as f64;
        }
        stats
    }
}
