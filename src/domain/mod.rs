pub mod aggregation;
pub mod category_colors;
pub mod formatting;
pub mod forms;
pub mod models;
pub mod month_grid;
