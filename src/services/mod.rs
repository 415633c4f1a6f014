pub mod collections;
pub mod ownership;
pub mod reorder;
