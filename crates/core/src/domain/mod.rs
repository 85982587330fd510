pub mod catalog;
pub mod series;
pub mod survey;
pub mod transaction;
