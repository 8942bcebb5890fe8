pub mod clock;
pub mod document;
pub mod page;
pub mod selector;
pub mod setter;
pub mod widget;
