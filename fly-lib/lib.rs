pub mod animation;
pub mod clipboard;
pub mod command;
pub mod config;
pub mod document;
pub mod edit;
pub mod events;
pub mod filter;
pub mod find_under;
pub mod movement;
pub mod paragraph;
pub mod registry;
pub mod scanner;
pub mod select;
pub mod selection;
pub mod session;
pub mod sneak;
pub mod surface;
pub mod word;
