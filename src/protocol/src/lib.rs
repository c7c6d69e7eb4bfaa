pub mod pr_model;
pub mod user_event;
