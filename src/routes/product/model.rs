use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{
    CursorPagination, NewProduct, Pagination, ProductCursorQuery, ProductFilter, ProductPatch,
    ProductQuery, SortSpec,
};
use crate::validation::{
    ValidationError, ValidationResult, sanitize, validate_description, validate_price,
    validate_product_name, validate_stock,
};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: i32,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> ValidationResult<NewProduct> {
        let name = sanitize(&self.name);
        let description = sanitize(&self.description);

        validate_product_name(&name)?;
        validate_description(&description)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;

        Ok(NewProduct {
            name,
            description,
            price: self.price,
            stock: self.stock,
        })
    }
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> ValidationResult<ProductPatch> {
        let name = self.name.map(|n| sanitize(&n));
        let description = self.description.map(|d| sanitize(&d));

        if let Some(name) = &name {
            validate_product_name(name)?;
        }
        if let Some(description) = &description {
            validate_description(description)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }

        Ok(ProductPatch {
            name,
            description,
            price: self.price,
            stock: self.stock,
        })
    }
}

/// Query string accepted by the filtered and cursor listings.
///
/// `sort_field` and `sort_direction` may hold comma-separated lists that
/// pair up by position.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub updated_from: Option<DateTime<Utc>>,
    pub updated_to: Option<DateTime<Utc>>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub cursor: Option<String>,
}

impl ProductListParams {
    fn filter(&self) -> ProductFilter {
        let name = self.name.as_deref().map(sanitize);
        ProductFilter {
            min_price: self.min_price,
            max_price: self.max_price,
            min_stock: self.min_stock,
            max_stock: self.max_stock,
            created_from: self.created_from,
            created_to: self.created_to,
            updated_from: self.updated_from,
            updated_to: self.updated_to,
            ..ProductFilter::default()
        }
        .with_name(name.as_deref())
    }

    /// Unknown fields are dropped; a missing or unknown direction is
    /// ascending.
    fn sort(&self) -> Vec<SortSpec> {
        let Some(fields) = self.sort_field.as_deref() else {
            return Vec::new();
        };
        let mut directions = self
            .sort_direction
            .as_deref()
            .map(|d| d.split(',').collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();

        fields
            .split(',')
            .filter_map(|field| {
                let direction = directions.next();
                SortSpec::parse(field, direction)
            })
            .collect()
    }

    pub fn into_query(self) -> ValidationResult<ProductQuery> {
        let pagination = Pagination::new(self.page, self.page_size)
            .map_err(|e| ValidationError::new("pagination", e))?;
        Ok(ProductQuery {
            filter: self.filter(),
            sort: self.sort(),
            pagination,
        })
    }

    pub fn into_cursor_query(self) -> ValidationResult<ProductCursorQuery> {
        let cursor = match self.cursor.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<Uuid>()
                    .map_err(|_| ValidationError::new("cursor", "cursor must be a product id"))?,
            ),
        };
        let pagination = CursorPagination::new(cursor, self.page_size)
            .map_err(|e| ValidationError::new("pagination", e))?;
        Ok(ProductCursorQuery {
            filter: self.filter(),
            sort: self.sort(),
            pagination,
        })
    }
}
