pub mod admin;
pub mod staff;
pub mod system;
pub mod user;
pub mod vaccine;
