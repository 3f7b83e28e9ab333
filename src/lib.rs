pub mod app;
pub mod bands;
pub mod config;
pub mod decode;
pub mod eq;
pub mod output;
pub mod pcm;
pub mod player;
pub mod prefs;
pub mod render;
pub mod terminal;
pub mod viz;
