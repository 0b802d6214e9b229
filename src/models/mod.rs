pub mod requisition;
pub mod user;

pub use requisition::{
    DefectReason, DeliveryItem, PhotoAttachment, Requisition, RequisitionStatus, RequisitionType,
    ServiceItem,
};
pub use user::{
    ChangePasswordRequest, CreateUserRequest, LoginRequest, UpdateUserRequest, User, UserResponse,
    UserRole,
};
