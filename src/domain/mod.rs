pub mod calendar;
pub mod catalog;
pub mod directory;
pub mod ticket;
