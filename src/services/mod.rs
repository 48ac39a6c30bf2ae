// Cart and catalog
pub mod commerce;

// Abandoned-cart reminders
pub mod cart_reminder;
