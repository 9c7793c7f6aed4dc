use serde::{Deserialize, Serialize};

/// Column names of a product line, in file order.
pub const PRODUCT_FIELDS: [&str; 4] = ["id", "name", "description", "price"];

/// One product row, as read from the input file and inserted into the `Product` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Integer amount; discounts truncate toward zero.
    pub price: i64,
}
