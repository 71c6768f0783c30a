pub mod access;
pub use access::{AccessError, Principal};

pub mod uploads;
pub use uploads::{UploadError, UploadStore};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, NewPassword, RegisterRequest, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod occupancy_service;
pub mod occupancy_service_impl;
pub use occupancy_service::{
    AssignOutcome, AssignRequest, DashboardStats, DormitoryInput, DormitoryView,
    EditStudentRequest, NewStudentRequest, OccupancyError, OccupancyService, ProfileUpdate,
    StudentView,
};
pub use occupancy_service_impl::SeaOrmOccupancyService;

pub mod repair_service;
pub mod repair_service_impl;
pub use repair_service::{
    ImageUpload, RepairError, RepairService, SubmitTicket, Submitted, TicketView,
};
pub use repair_service_impl::SeaOrmRepairService;
