pub mod surplus;
pub mod surplus_volume;
pub mod user_defined;
