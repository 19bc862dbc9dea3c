//! All Paths are recorded here for use throughout this codebase
pub mod base {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const ABOUT: &str = "/about";
}

pub mod rate_limits {
    pub const LIMIT: &str = "/rl/{client_id}";
    pub const POLICY: &str = "/rl-policy";
}

pub fn limit_path(client_id: &str) -> String {
    rate_limits::LIMIT.replace("{client_id}", client_id)
}
