pub mod http;
pub mod reschedule;
pub mod responder;
