pub mod order_service;
pub mod quarter_service;
pub mod report_service;

pub use order_service::OrderService;
pub use quarter_service::QuarterService;
pub use report_service::ReportService;
