pub mod openai_client;
pub mod schedule_client;
