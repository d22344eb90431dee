pub mod auth;
pub mod database;
pub mod encrypt;
pub mod enums;
pub mod routes;
pub mod structures;
