pub mod apartment;
pub mod availability;
pub mod lifecycle;
pub mod policy;
pub mod pricing;
pub mod priority;
pub mod reservation;
pub mod scoring;
pub mod season;
pub mod stay;
pub mod user;
