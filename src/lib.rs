pub mod metadata {
    include!(concat!(env!("OUT_DIR"), "/pkg_info.rs"));
}

pub mod calendar;
pub mod cli;
pub mod commands;
pub mod error;
pub mod server;
pub mod sprint;
pub mod storage;
pub mod store;
pub mod types;
pub mod view;
