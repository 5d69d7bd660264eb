use tokio::sync::mpsc;

use crate::{LogEvent, LogSeverity};

/// Best-effort progress channel
///
/// Every event is mirrored to `tracing`. Delivery to the external sink never
/// blocks: a full or closed channel drops the event.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<mpsc::Sender<LogEvent>>,
}

impl ProgressSink {
    pub fn new(sender: mpsc::Sender<LogEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Sink that only logs
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: LogEvent) {
        match event.severity {
            LogSeverity::Info | LogSeverity::Success => tracing::info!("{}", event.message),
            LogSeverity::Warning => tracing::warn!("{}", event.message),
            LogSeverity::Error => tracing::error!("{}", event.message),
        }
        if let Some(sender) = &self.sender {
            let _ = sender.try_send(event);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogEvent::info(message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(LogEvent::success(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(LogEvent::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogEvent::error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ProgressSink::new(tx);
        sink.success("done");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.message, "done");
        assert_eq!(event.severity, LogSeverity::Success);
    }

    #[test]
    fn test_full_or_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        let sink = ProgressSink::new(tx);
        sink.info("one");
        sink.info("two");
        drop(rx);
        sink.warning("three");
        ProgressSink::silent().error("nobody listens");
    }
}
