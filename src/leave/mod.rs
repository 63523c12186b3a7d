pub mod accrual;
pub mod calendar;
pub mod ledger;
pub mod lifecycle;
