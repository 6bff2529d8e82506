use log::{debug, error, info, warn};

/// Initialize the logger
pub fn init_logger() {
    env_logger::init();
}

/// Log an informational message
pub fn log_info(message: &str) {
    info!("{}", message);
}

/// Log a debug message
pub fn log_debug(message: &str) {
    debug!("{}", message);
}

/// Log a warning message
pub fn log_warning(message: &str) {
    warn!("{}", message);
}

/// Log an error message
pub fn log_error(message: &str) {
    error!("{}", message);
}

/// Log connection details for the node RPC client
pub fn log_node_connection_details(url: &str, username: &str) {
    info!("Node RPC connection details: {}@{}", username, url);
}

/// Log database connection details
pub fn log_database_connection_details(url: &str) {
    info!("Database connection details: {}", url);
}
