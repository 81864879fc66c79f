pub mod sparse_grid;
pub mod linear_grid;
pub mod modlinear_grid;
