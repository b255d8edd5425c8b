//! Typed product query: filters, sort order and pagination.
//!
//! Parsing from loose strings happens here so that two requests asking for
//! the same thing end up as equal values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_to: Option<DateTime<Utc>>,
}

impl ProductFilter {
    /// Sets the name substring filter; blank input clears it.
    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = &self.name {
            if !product.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        within(product.price, self.min_price, self.max_price)
            && within(product.stock, self.min_stock, self.max_stock)
            && within(product.created_at, self.created_from, self.created_to)
            && within(product.updated_at, self.updated_from, self.updated_to)
    }
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

/// Sortable columns. Anything else is dropped during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Price,
    Stock,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "name" => Some(SortField::Name),
            "price" => Some(SortField::Price),
            "stock" => Some(SortField::Stock),
            "created_at" => Some(SortField::CreatedAt),
            "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Stock => "stock",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Unknown or missing directions default to ascending.
    pub fn parse(direction: Option<&str>) -> Self {
        match direction.map(str::trim) {
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn parse(field: &str, direction: Option<&str>) -> Option<Self> {
        Some(Self {
            field: SortField::parse(field.trim())?,
            direction: SortDirection::parse(direction),
        })
    }

    /// Order applied when a query names no valid sort field.
    pub fn default_order() -> Vec<SortSpec> {
        vec![SortSpec {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }]
    }
}

/// Sort fields with the allow-list applied; returns the default order when
/// nothing valid remains.
pub fn effective_sort(sort: &[SortSpec]) -> Vec<SortSpec> {
    if sort.is_empty() {
        SortSpec::default_order()
    } else {
        sort.to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Result<Self, String> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err("page must be at least 1".to_string());
        }
        Ok(Self {
            page,
            page_size: check_page_size(page_size)?,
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPagination {
    /// Id of the last item of the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Uuid>,
    pub page_size: u32,
}

impl CursorPagination {
    pub fn new(cursor: Option<Uuid>, page_size: Option<u32>) -> Result<Self, String> {
        Ok(Self {
            cursor,
            page_size: check_page_size(page_size)?,
        })
    }
}

fn check_page_size(page_size: Option<u32>) -> Result<u32, String> {
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(format!("page_size must be between 1 and {MAX_PAGE_SIZE}"));
    }
    Ok(page_size)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: Vec<SortSpec>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCursorQuery {
    pub filter: ProductFilter,
    pub sort: Vec<SortSpec>,
    pub pagination: CursorPagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl ProductPage {
    pub fn new(products: Vec<Product>, total: i64, pagination: Pagination) -> Self {
        let page_size = i64::from(pagination.page_size);
        let total_pages = ((total.max(0) + page_size - 1) / page_size) as u32;
        Self {
            products,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCursorPage {
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_cursor: Option<String>,
    pub has_next: bool,
    pub has_prev: bool,
}

impl ProductCursorPage {
    /// Builds a page from up to `page_size + 1` fetched rows; the extra row
    /// only signals that another page exists.
    pub fn from_rows(mut rows: Vec<Product>, pagination: CursorPagination) -> Self {
        let page_size = pagination.page_size as usize;
        let has_next = rows.len() > page_size;
        rows.truncate(page_size);

        let next_cursor = rows.last().map(|p| p.id.to_string());
        let prev_cursor = pagination
            .cursor
            .and_then(|_| rows.first().map(|p| p.id.to_string()));

        Self {
            products: rows,
            next_cursor,
            prev_cursor,
            has_next,
            has_prev: pagination.cursor.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProduct;

    fn product(name: &str, price: f64, stock: i32) -> Product {
        Product::new(
            Uuid::new_v4(),
            NewProduct {
                name: name.into(),
                description: String::new(),
                price,
                stock,
            },
        )
    }

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!(SortField::parse("price"), Some(SortField::Price));
        assert_eq!(SortField::parse("password_hash"), None);
        assert_eq!(SortField::parse("price; DROP TABLE products"), None);
    }

    #[test]
    fn test_invalid_direction_defaults_to_ascending() {
        assert_eq!(SortDirection::parse(Some("DESC")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(None), SortDirection::Asc);
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(Pagination::new(Some(0), None).is_err());
        assert!(Pagination::new(None, Some(0)).is_err());
        assert!(Pagination::new(None, Some(101)).is_err());

        let p = Pagination::new(Some(3), Some(100)).unwrap();
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn test_filter_matches_name_case_insensitively() {
        let filter = ProductFilter::default().with_name(Some(" gad "));
        assert!(filter.matches(&product("Super Gadget", 1.0, 1)));
        assert!(!filter.matches(&product("Widget", 1.0, 1)));
    }

    #[test]
    fn test_filter_price_range_is_inclusive() {
        let filter = ProductFilter {
            min_price: Some(20.0),
            max_price: Some(100.0),
            ..Default::default()
        };
        assert!(filter.matches(&product("a", 29.99, 1)));
        assert!(filter.matches(&product("a", 20.0, 1)));
        assert!(!filter.matches(&product("a", 19.99, 1)));
    }

    #[test]
    fn test_page_totals() {
        let page = ProductPage::new(Vec::new(), 41, Pagination::new(Some(2), Some(20)).unwrap());
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);

        let empty = ProductPage::new(Vec::new(), 0, Pagination::default());
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_cursor_page_trims_lookahead_row() {
        let rows = vec![product("a", 1.0, 1), product("b", 1.0, 1), product("c", 1.0, 1)];
        let second_id = rows[1].id.to_string();
        let page = ProductCursorPage::from_rows(rows, CursorPagination::new(None, Some(2)).unwrap());

        assert_eq!(page.products.len(), 2);
        assert!(page.has_next);
        assert!(!page.has_prev);
        assert_eq!(page.next_cursor, Some(second_id));
        assert_eq!(page.prev_cursor, None);
    }
}
