pub mod details;
pub mod diagram;
pub mod dialog;
pub mod help;
pub mod search;
pub mod status_bar;
pub mod table;
