pub mod auth;
pub mod categories;
pub mod content;
pub mod orders;
pub mod products;
pub mod users;
