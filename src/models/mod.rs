pub mod customer;
pub mod order;
pub mod report;

pub use customer::*;
pub use order::*;
pub use report::*;
