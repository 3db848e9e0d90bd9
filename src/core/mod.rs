pub mod facts;
pub mod numa;
