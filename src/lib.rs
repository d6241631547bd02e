// Library for tests to access modules

pub mod bus;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod history;
pub mod models;
pub mod parsers;
pub mod platform;
pub mod samplers;
pub mod scheduler;
pub mod state;
pub mod worker;
