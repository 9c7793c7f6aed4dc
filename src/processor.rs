use log::debug;

use crate::{
    BatchError,
    core::item::{ItemProcessor, ItemProcessorResult},
    model::Product,
};

/// Applies a percentage discount to the price of each product.
///
/// `price' = price - price * percent / 100`, using integer division that
/// truncates toward zero. Negative prices are not rejected; a result that
/// does not fit in `i64` (only possible outside `0..=100` percent) is an
/// `ItemProcessor` error.
///
/// ```
/// use product_batch::core::item::ItemProcessor;
/// use product_batch::model::Product;
/// use product_batch::processor::DiscountProcessor;
///
/// let processor = DiscountProcessor::default();
/// let product = Product {
///     id: 1,
///     name: "Widget".to_string(),
///     description: "A small widget".to_string(),
///     price: 100,
/// };
///
/// assert_eq!(processor.process(&product).unwrap().price, 90);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiscountProcessor {
    percent: i64,
}

impl DiscountProcessor {
    pub fn new(percent: i64) -> Self {
        Self { percent }
    }

    pub fn percent(&self) -> i64 {
        self.percent
    }

    /// Discounted price, computed on 128 bits.
    pub fn discount(&self, price: i64) -> Result<i64, BatchError> {
        let reduction = i128::from(price) * i128::from(self.percent) / 100;
        i64::try_from(i128::from(price) - reduction).map_err(|_| {
            BatchError::ItemProcessor(format!(
                "price {} discounted by {}% is out of range",
                price, self.percent
            ))
        })
    }
}

impl Default for DiscountProcessor {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ItemProcessor<Product, Product> for DiscountProcessor {
    fn process(&self, item: &Product) -> ItemProcessorResult<Product> {
        let price = self.discount(item.price)?;
        debug!("Product {}: price {} -> {}", item.id, item.price, price);

        Ok(Product {
            price,
            ..item.clone()
        })
    }
}
