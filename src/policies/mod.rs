pub mod pricing;
pub mod timing;
