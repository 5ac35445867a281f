use std::path::PathBuf;

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Optional JSON file the catalog is seeded from.
    pub catalog_file: Option<PathBuf>,
    /// Buffer size of each broadcast topic channel.
    pub channel_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("TRIAGE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8482); // 8482 is ascii for 'TR'

        let catalog_file = std::env::var("TRIAGE_CATALOG")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        match &catalog_file {
            Some(path) => tracing::info!(path = %path.display(), "Catalog seed file configured"),
            None => tracing::warn!("TRIAGE_CATALOG not set, starting with an empty catalog"),
        }

        let channel_capacity = std::env::var("TRIAGE_CHANNEL_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            port,
            catalog_file,
            channel_capacity,
        }
    }
}
