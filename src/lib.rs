pub mod fetch;
pub mod playlist;
pub mod rules;
pub mod settings;
pub mod storage;
