//! Routing logic shared by the link tasks

pub mod dispatcher;

pub use dispatcher::EventDispatcher;
