pub mod events;
pub mod jobs;
