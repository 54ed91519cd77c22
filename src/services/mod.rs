// Services module - Validation, tokenization and auth tokens

pub mod auth_token;
pub mod card_number;
pub mod card_schema;
pub mod tokenizer;
pub mod validators;
