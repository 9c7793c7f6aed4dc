//! Delimited text support.
//!
//! [`csv_reader::CsvItemReader`] streams a delimited file one line at a time
//! and maps each line onto a serde `Deserialize` type, either by position or
//! by a configured list of column names.
//!
//! # Examples
//!
//! ```
//! use product_batch::item::csv::csv_reader::CsvItemReaderBuilder;
//! use product_batch::core::item::ItemReader;
//! use product_batch::model::{Product, PRODUCT_FIELDS};
//!
//! let csv_data = "\
//! 1,Widget,A small widget,100
//! 2,Gadget,A gadget,200
//! ";
//!
//! let reader = CsvItemReaderBuilder::new()
//!     .delimiter(b',')
//!     .names(&PRODUCT_FIELDS)
//!     .from_reader(csv_data.as_bytes());
//!
//! let mut products: Vec<Product> = Vec::new();
//! while let Some(product) = reader.read().unwrap() {
//!     products.push(product);
//! }
//!
//! assert_eq!(products.len(), 2);
//! assert_eq!(products[1].name, "Gadget");
//! assert_eq!(products[1].price, 200);
//! ```

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;
