/// Route paths of every HTTP surface
pub mod paths {
    /// JSON gateway
    pub const PLUGINS: &str = "/v1/plugins";
    pub const PLUGIN_BY_ID: &str = "/v1/plugins/:id";

    /// Package files
    pub const FILES: &str = "/files";
    pub const FILE_BY_KEY: &str = "/files/*key";
}
