pub mod audit;
pub mod order;
pub mod package;
pub mod principal;
pub mod product;
