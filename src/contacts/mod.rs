pub mod coordinator;
pub mod form;
pub mod list;
