pub mod event;
pub mod job;
pub mod ledger;
pub mod worker;
