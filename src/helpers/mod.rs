mod backoff_retry;
mod load_dotenv;
mod stop_signal;
mod time;

pub use backoff_retry::backoff_retry;
pub use load_dotenv::load_dotenv;
pub use stop_signal::{StopSignal, StopTrigger};
pub use time::fmt_opt_ts;

pub mod base_path;
