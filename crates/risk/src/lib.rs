pub mod sizer;

pub use sizer::{build_order, truncate_to_precision};
