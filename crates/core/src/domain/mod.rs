pub mod forecast;
pub mod recipe;
pub mod sales;
