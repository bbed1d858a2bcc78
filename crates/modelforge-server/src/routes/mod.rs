pub mod admin;
pub mod export;
pub mod health;
pub mod phases;
pub mod projects;
pub mod recalc;
