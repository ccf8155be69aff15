pub mod billing_event;
pub mod capability;
pub mod company;
pub mod member;
pub mod subscription;
