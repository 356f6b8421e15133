pub mod counting;
pub mod reading;
