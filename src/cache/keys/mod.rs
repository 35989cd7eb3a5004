/// 匿名调用方的标识符前缀
const IP_PREFIX: &str = "ip_";

/// 登录用户的标识符前缀
const USER_PREFIX: &str = "user_";

/// 生成匿名调用方的标识符
pub fn ip_identifier(addr: &str) -> String {
    format!("{}{}", IP_PREFIX, addr)
}

/// 生成登录用户的标识符
pub fn user_identifier(user_id: &str) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}
