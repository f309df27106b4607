//! Page diagnostics: accumulate console output and runtime errors.
//!
//! [`ErrorCollector::attach`] subscribes two handlers to the page, one for
//! console output and one for uncaught runtime errors, and returns a handle
//! onto a shared pair of append-only logs:
//!
//! * `console_log`: every console message, whatever its level
//! * `error_log`: error-level console messages plus uncaught exceptions
//!
//! The handlers keep appending for as long as the page lives; the pipeline
//! reads a [`PageLogs`] snapshot after navigation (and any extra wait).

use crate::renderer::{Page, PageEvent, PageEventKind, SourceLocation};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Origin of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogKind {
    Console,
    PageError,
}

/// One captured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub kind: LogKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Both log sequences, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLogs {
    pub console_log: Vec<ErrorLogEntry>,
    pub error_log: Vec<ErrorLogEntry>,
}

impl PageLogs {
    fn record(&mut self, event: &PageEvent) {
        match event {
            PageEvent::Console(msg) => {
                let entry = ErrorLogEntry {
                    kind: LogKind::Console,
                    message: msg.text.clone(),
                    source_location: msg.location.clone(),
                    stack_trace: None,
                };
                if msg.level.is_error() {
                    self.error_log.push(entry.clone());
                }
                self.console_log.push(entry);
            }
            PageEvent::PageError(err) => {
                self.error_log.push(ErrorLogEntry {
                    kind: LogKind::PageError,
                    message: err.message.clone(),
                    source_location: None,
                    stack_trace: err.stack.clone(),
                });
            }
        }
    }
}

/// Live handle onto the logs of one page.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    logs: Arc<Mutex<PageLogs>>,
}

impl ErrorCollector {
    /// Register on `page` and start collecting.
    pub fn attach(page: &dyn Page) -> Self {
        let collector = Self::default();
        for kind in [PageEventKind::Console, PageEventKind::PageError] {
            let logs = Arc::clone(&collector.logs);
            page.on_event(
                kind,
                Arc::new(move |event: &PageEvent| {
                    if let Ok(mut logs) = logs.lock() {
                        logs.record(event);
                    }
                }),
            );
        }
        collector
    }

    /// Copy of everything collected so far.
    pub fn snapshot(&self) -> PageLogs {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Page2PdfError;
    use crate::renderer::{
        ConsoleLevel, ConsoleMessage, NavigateOptions, NavigationResponse, PageEventHandler,
        PdfOptions, RuntimeError,
    };
    use crate::request::InputProps;
    use async_trait::async_trait;

    /// Page that only supports event registration and manual emission.
    #[derive(Default)]
    struct EventPage {
        handlers: Mutex<Vec<(PageEventKind, PageEventHandler)>>,
    }

    impl EventPage {
        fn emit(&self, event: PageEvent) {
            for (kind, h) in self.handlers.lock().unwrap().iter() {
                if *kind == event.kind() {
                    h(&event);
                }
            }
        }
    }

    #[async_trait]
    impl Page for EventPage {
        fn on_event(&self, kind: PageEventKind, handler: PageEventHandler) {
            self.handlers.lock().unwrap().push((kind, handler));
        }
        async fn inject_before_load(&self, _: &InputProps) -> Result<(), Page2PdfError> {
            Ok(())
        }
        async fn navigate(
            &self,
            _: &str,
            _: &NavigateOptions,
        ) -> Result<Option<NavigationResponse>, Page2PdfError> {
            Ok(None)
        }
        async fn rasterize(&self, _: &PdfOptions) -> Result<Vec<u8>, Page2PdfError> {
            Ok(Vec::new())
        }
        async fn close(&self) -> Result<(), Page2PdfError> {
            Ok(())
        }
    }

    fn console(level: ConsoleLevel, text: &str) -> PageEvent {
        PageEvent::Console(ConsoleMessage {
            level,
            text: text.into(),
            location: Some(SourceLocation {
                url: "https://example.com/app.js".into(),
                line: 10,
                column: 4,
            }),
        })
    }

    #[test]
    fn console_messages_always_logged_errors_also_in_error_log() {
        let page = EventPage::default();
        let collector = ErrorCollector::attach(&page);

        page.emit(console(ConsoleLevel::Log, "hello"));
        page.emit(console(ConsoleLevel::Error, "boom"));
        page.emit(console(ConsoleLevel::Warning, "careful"));

        let logs = collector.snapshot();
        assert_eq!(logs.console_log.len(), 3);
        assert_eq!(logs.error_log.len(), 1);
        assert_eq!(logs.error_log[0].message, "boom");
        assert_eq!(logs.error_log[0].kind, LogKind::Console);
        assert_eq!(logs.error_log[0].source_location.as_ref().unwrap().line, 10);
    }

    #[test]
    fn runtime_errors_only_in_error_log() {
        let page = EventPage::default();
        let collector = ErrorCollector::attach(&page);

        page.emit(PageEvent::PageError(RuntimeError {
            message: "TypeError: x is undefined".into(),
            stack: Some("at render (app.js:3:1)".into()),
        }));

        let logs = collector.snapshot();
        assert!(logs.console_log.is_empty());
        assert_eq!(logs.error_log.len(), 1);
        assert_eq!(logs.error_log[0].kind, LogKind::PageError);
        assert_eq!(
            logs.error_log[0].stack_trace.as_deref(),
            Some("at render (app.js:3:1)")
        );
    }

    #[test]
    fn registers_one_listener_per_kind() {
        let page = EventPage::default();
        let _collector = ErrorCollector::attach(&page);
        let kinds: Vec<_> = page.handlers.lock().unwrap().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, [PageEventKind::Console, PageEventKind::PageError]);
    }

    #[test]
    fn entries_keep_arrival_order() {
        let page = EventPage::default();
        let collector = ErrorCollector::attach(&page);
        for i in 0..5 {
            page.emit(console(ConsoleLevel::Error, &format!("e{i}")));
        }
        let messages: Vec<_> = collector
            .snapshot()
            .error_log
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, ["e0", "e1", "e2", "e3", "e4"]);
    }

    #[test]
    fn entry_serialises_camel_case() {
        let entry = ErrorLogEntry {
            kind: LogKind::PageError,
            message: "oops".into(),
            source_location: None,
            stack_trace: Some("trace".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "pageError");
        assert_eq!(json["stackTrace"], "trace");
        assert!(json.get("sourceLocation").is_none());
    }
}
