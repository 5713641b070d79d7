/// 用户信息缓存键前缀
const USER_PREFIX: &str = "user:";

/// 用户邮箱索引缓存键前缀
const USER_EMAIL_PREFIX: &str = "user:email:";

/// 按ID生成用户缓存键
pub fn user_key(user_id: &str) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}

/// 按邮箱生成用户缓存键
pub fn user_email_key(email: &str) -> String {
    format!("{}{}", USER_EMAIL_PREFIX, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats() {
        assert_eq!(user_key("u1"), "user:u1");
        assert_eq!(user_email_key("a@b.c"), "user:email:a@b.c");
    }
}
