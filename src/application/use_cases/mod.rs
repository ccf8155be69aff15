pub mod billing;
pub mod checkout;
pub mod entitlement;
