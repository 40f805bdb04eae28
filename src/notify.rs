use log::error;

/// 面向用户的错误提示出口（界面上的 toast 等）
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// 默认实现：写入错误日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error(&self, message: &str) {
        error!("{}", message);
    }
}
