//! Mock version of an ItemWriter of products.
use mockall::mock;

use product_batch::{
    core::item::{ItemWriter, ItemWriterResult},
    model::Product,
    BatchError,
};

mock! {
    pub Writer {}
    impl ItemWriter<Product> for Writer {
        fn write(&self, items: &[Product]) -> ItemWriterResult;
        fn open(&self) -> Result<(), BatchError>;
        fn close(&self) -> Result<(), BatchError>;
    }
}
