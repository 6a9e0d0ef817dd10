pub mod ai_gateway;
pub mod auth_service;
pub mod calendar_view;
pub mod event_service;
