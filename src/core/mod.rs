pub mod cache;
pub mod capability;
pub mod clock;
pub mod countdown;
pub mod phone;
pub mod reminder;
pub mod view;
