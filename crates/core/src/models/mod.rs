//! Record types for each layer
//!
//! - `raw`: unvalidated source rows
//! - `silver`: cleaned rows with derived flags
//! - `lookup`: closed vocabularies used during cleaning

pub mod lookup;
pub mod raw;
pub mod silver;

pub use lookup::{BrazilianState, OrderStatus};
pub use raw::{
    RawCategoryTranslation, RawCustomer, RawGeolocation, RawOrder, RawOrderItem, RawPayment,
    RawProduct, RawReview, RawSeller,
};
pub use silver::{
    CUSTOMERS_UNIQUE_PATH, SilverCustomer, SilverGeolocation, SilverOrder, SilverOrderItem,
    SilverPayment, SilverProduct, SilverReview, SilverSeller,
};
