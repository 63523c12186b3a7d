pub mod admin;
pub mod holidays;
pub mod leave_request;
