pub mod activities;
pub mod applications;
pub mod colleges;
pub mod companies;
pub mod database;
pub mod documents;
pub mod follows;
pub mod jobs;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod students;
pub mod tickets;
pub mod users;
