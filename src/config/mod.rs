mod client;

pub use client::{
    ClientConfig, ExportConfig, HttpConfig, SyncConfig, config_dir, default_config_path,
};
