pub mod buyer;

pub use buyer::BuyerData;
