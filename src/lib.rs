pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod live;
pub mod store;
pub mod types;
pub mod view;

pub mod metadata {
    include!(concat!(env!("OUT_DIR"), "/pkg_info.rs"));
}
