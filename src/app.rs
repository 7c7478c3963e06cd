pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_ID: &str = "devrunner";

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PROJECTS_FILE: &str = "projects.json";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_DEPENDENCY_DIR: &str = "node_modules";
pub const DEFAULT_INSTALL_COMMAND: &str = "npm install";
