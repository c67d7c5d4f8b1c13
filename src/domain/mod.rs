mod category;
mod emoji;
mod expense;
mod money;
mod validation;

pub use category::*;
pub use emoji::*;
pub use expense::*;
pub use money::*;
pub use validation::*;
