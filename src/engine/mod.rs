pub mod dispatch;
pub mod intake;
pub mod ledger;
pub mod lifecycle;
pub mod matcher;
pub mod pool;
pub mod queue;

#[cfg(test)]
pub(crate) mod testutil;
