use log::error;

/// Notifier is the user-visible error surface of a session
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Reports through the `log` facade at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        error!("{}", message);
    }
}
