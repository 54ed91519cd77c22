// Models module - Database entity representations

pub mod credit_card;

pub use credit_card::CreditCard;
