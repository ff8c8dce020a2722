pub mod bootstrap;
pub mod controller;

pub use controller::{AppController, DispatchSummary};
