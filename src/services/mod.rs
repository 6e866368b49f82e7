pub mod scheduling;
pub mod booking;
pub mod reviews;
pub mod halls;
