pub mod account;
pub mod dormitory;
pub mod repair;
pub mod staff;
pub mod student;
