pub mod export;
pub mod predict;
pub mod price;
pub mod setup;
pub mod ui;
