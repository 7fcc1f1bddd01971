pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod stdev;

pub use momentum::momentum;
pub use rsi::relative_strength_index;
pub use sma::{mid_close_average, simple_moving_average};
pub use stdev::standard_deviation;
