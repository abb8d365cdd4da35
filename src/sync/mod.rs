pub mod poller;
pub mod tracker;
