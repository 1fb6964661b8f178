pub mod account;
pub mod department;
pub mod doctor;
pub mod organization;
pub mod password;

pub use account::AccountService;
pub use department::DepartmentService;
pub use doctor::DoctorService;
pub use organization::OrganizationService;
