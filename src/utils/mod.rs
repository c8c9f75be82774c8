pub mod time;
#[cfg(feature = "python")]
pub mod py_to_json;

pub use time::{duration_from_secs, format_datetime};
#[cfg(feature = "python")]
pub use py_to_json::py_to_json;
