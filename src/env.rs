use std::str::FromStr;

lazy_static! {
    pub static ref ENV_TELLO_ADDR: String =
        get_env_str("ENV_TELLO_ADDR", String::from("192.168.10.1"));
    pub static ref ENV_TELLO_CMD_PORT: u16 = get_env("ENV_TELLO_CMD_PORT", 8889);
    pub static ref ENV_TELLO_LOCAL_CMD_PORT: u16 = get_env("ENV_TELLO_LOCAL_CMD_PORT", 8889);
    pub static ref ENV_TELLO_VIDEO_PORT: u16 = get_env("ENV_TELLO_VIDEO_PORT", 11111);
    pub static ref ENV_TELLO_RESPONSE_TIMEOUT_MS: u64 =
        get_env("ENV_TELLO_RESPONSE_TIMEOUT_MS", 7000);
    pub static ref ENV_TELLO_TAKEOFF_TIMEOUT_MS: u64 =
        get_env("ENV_TELLO_TAKEOFF_TIMEOUT_MS", 20000);
}

pub fn get_env_str(name: &str, value: String) -> String {
    std::env::var(name).unwrap_or(value)
}

pub fn get_env<T: FromStr>(name: &str, value: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(value)
}
