#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Product batch

 Chunk-oriented import of product rows from a delimited file into a SQL
 table: each line is read, its price discounted, and every `chunk_size`
 products are inserted in one transaction.

 ## Core Concepts

- **Job:** the whole batch process, composed of one or more `Step`s.
- **Step:** a chunk-oriented phase: read up to `chunk_size` items, process each one, write the chunk.
- **ItemReader:** retrieval of input, one item at a time (`CsvItemReader`).
- **ItemProcessor:** business logic applied to each item (`DiscountProcessor`).
- **ItemWriter:** output, one chunk at a time, atomically (`SqliteItemWriter`).

 A failing chunk fails the step and the job. Chunks committed before it stay
 committed; with a checkpoint, a later run resumes after them.

 ## Features

| **Feature**   | **Description**                                              |
|---------------|--------------------------------------------------------------|
| csv           | Enables the CSV `ItemReader`                                 |
| rdbc-sqlite   | Enables the SQLite `ItemWriter` and the chunk checkpoint     |
| full          | Enables all available features                               |

 ## Getting Started

```rust
# use product_batch::{
#     core::{
#         job::{Job, JobBuilder},
#         step::{Step, StepBuilder, StepInstance, StepStatus},
#     },
#     error::BatchError,
#     item::csv::csv_reader::CsvItemReaderBuilder,
#     item::rdbc::SqliteItemWriterBuilder,
#     model::{Product, PRODUCT_FIELDS},
#     processor::DiscountProcessor,
# };
# use sqlx::sqlite::SqlitePoolOptions;
#[tokio::main]
async fn main() -> Result<(), BatchError> {
    let csv = "1,Widget,A small widget,100
2,Gadget,A gadget,200
3,Gizmo,Tiny gizmo,50";

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("CREATE TABLE Product (id INTEGER PRIMARY KEY, name TEXT, description TEXT, price INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    let reader = CsvItemReaderBuilder::new()
        .names(&PRODUCT_FIELDS)
        .from_reader(csv.as_bytes());

    let processor = DiscountProcessor::default();

    let writer = SqliteItemWriterBuilder::<Product>::new()
        .pool(&pool)
        .sql("insert into Product (id,name,description,price) values (:id,:name,:description,:price)")
        .build()?;

    let step: StepInstance<Product, Product> = StepBuilder::new()
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(2) // set commit interval
        .build()?;

    let job = JobBuilder::new().start(&step).build();
    let result = job.run();

    assert!(result.is_ok());
    assert!(step.get_status() == StepStatus::Success);
    assert_eq!(step.get_commit_count(), 2);

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of items readers / writers
pub mod item;

/// The product record
pub mod model;

/// Product processors
pub mod processor;

/// Job parameters and command line
pub mod config;

#[cfg(all(feature = "csv", feature = "rdbc-sqlite"))]
pub mod product_import;
