// Error codes implementation
// Stable codes surfaced to clients next to the human-readable message

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const PAYLOAD_TOO_LARGE: &str = "VALIDATION_1002";
}

pub mod authentication {
    pub const INVALID_TOKEN_FORMAT: &str = "AUTH_2001";
    pub const UNAUTHORIZED: &str = "AUTH_2002";
    pub const UPSTREAM_UNAVAILABLE: &str = "AUTH_2003";
}

pub mod authorization {
    pub const INSUFFICIENT_SCOPE: &str = "AUTHZ_3001";
}

pub mod storage {
    pub const NOT_FOUND: &str = "STORAGE_4001";
    pub const OPERATION_FAILED: &str = "STORAGE_4002";
}

pub mod system {
    pub const CONFIGURATION: &str = "SYS_5001";
    pub const INTERNAL: &str = "SYS_5002";
}
