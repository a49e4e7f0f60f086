pub mod country_export;
pub mod fetcher;
pub mod harvest;
pub mod normalize;
pub mod retry;

pub use crate::domain::model::{Cell, HarvestOutcome, QueryPartition, TradeRecord};
pub use crate::domain::ports::{ApiRequest, ApiResponse, Clock, Storage, Transport};
pub use crate::utils::error::Result;
