pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

// Re-export all models and services for external use
pub use models::*;
pub use services::*;
pub use router::{
    create_admin_appointment_router, create_appointment_router, create_staff_appointment_router,
    AppointmentState,
};
