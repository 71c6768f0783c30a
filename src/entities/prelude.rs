pub use super::accounts::Entity as Accounts;
pub use super::dormitories::Entity as Dormitories;
pub use super::repairs::Entity as Repairs;
pub use super::staff::Entity as Staff;
pub use super::students::Entity as Students;
