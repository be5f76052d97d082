pub mod billing;
pub mod catalog;
pub mod order_builder;
pub mod pricing;
pub mod proration;
pub mod subscription_store;
