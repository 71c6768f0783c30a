pub mod prelude;

pub mod accounts;
pub mod dormitories;
pub mod repairs;
pub mod staff;
pub mod students;
