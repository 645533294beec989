//! Default locations used when neither the config file nor the CLI names one

pub const DATA_DIR: &str = "/var/lib/relsync";

pub const DB_PATH: &str = "/var/lib/relsync/relsync.sqlite";

pub const CONFIG_FILE_NAME: &str = "config.toml";
