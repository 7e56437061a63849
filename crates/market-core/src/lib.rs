pub mod coerce;
pub mod error;
pub mod fields;
pub mod traits;
pub mod types;

pub use coerce::*;
pub use error::*;
pub use fields::*;
pub use traits::*;
pub use types::*;
