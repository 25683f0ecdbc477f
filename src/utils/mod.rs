pub mod audit;
pub mod merge;
pub mod template;
pub mod weeks;
