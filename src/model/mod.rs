pub mod holiday;
pub mod leave_balance;
pub mod leave_request;
pub mod leave_type;
pub mod period;
pub mod role;
pub mod settings;
pub mod user;
