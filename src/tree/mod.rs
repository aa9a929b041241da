pub mod layout;
pub mod model;
pub mod search;
pub mod visibility;
