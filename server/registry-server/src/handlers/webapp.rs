use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Static files of the web application. Unknown paths get `index.html` so
/// the client side router can resolve them.
pub fn spa_service(static_dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")))
}
