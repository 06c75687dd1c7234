//! Notifier facade
//!
//! Ties configuration and the process context together: build, ignore
//! check, environment check, deliver.

use crate::assembler::Assembler;
use crate::config::Configuration;
use crate::context::ContextStore;
use crate::delivery::DeliveryOutcome;
use crate::input::NoticeInput;
use crate::notice::Notice;
use faultline_sanitize::Data;

/// Entry point for reporting errors
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    config: Configuration,
    context: ContextStore,
}

impl Notifier {
    /// Create a notifier
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            context: ContextStore::new(),
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Mutable configuration, for changes between reports
    #[inline]
    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    /// Process context store
    #[inline]
    #[must_use]
    pub fn context_store(&self) -> &ContextStore {
        &self.context
    }

    /// Merge entries into the process context
    pub fn context<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Data>,
    {
        self.context.merge(entries);
    }

    /// Clear the process context
    pub fn clear_context(&self) {
        self.context.clear();
    }

    /// Build a notice with the process context merged in
    #[must_use]
    pub fn build_notice(&self, input: &NoticeInput) -> Notice {
        Assembler::new(&self.config).with_context(&self.context).build(input)
    }

    /// Build, filter and deliver one report
    #[must_use]
    pub fn notify(&self, input: impl Into<NoticeInput>) -> DeliveryOutcome {
        let notice = self.build_notice(&input.into());
        if notice.ignore(&self.config) {
            tracing::info!(error_class = %notice.error_class, "notice ignored");
            return DeliveryOutcome::Ignored;
        }
        if !self.config.is_public() {
            tracing::debug!(
                environment = ?self.config.environment_name,
                "development environment, notice not delivered"
            );
            return DeliveryOutcome::Suppressed;
        }
        notice.deliver(&self.config)
    }

    /// Report a Rust error value
    #[must_use]
    pub fn notify_error<E>(&self, error: &E) -> DeliveryOutcome
    where
        E: std::error::Error + 'static,
    {
        self.notify(NoticeInput::from_error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::Exception;

    #[test]
    fn ignored_before_delivery() {
        let notifier = Notifier::new(Configuration::default());
        let outcome = notifier.notify(NoticeInput::new().with_error_class("ActionController::RoutingError"));
        assert!(matches!(outcome, DeliveryOutcome::Ignored));
    }

    #[test]
    fn development_environment_is_suppressed() {
        let notifier = Notifier::new(Configuration::default().with_environment_name("development"));
        let outcome = notifier.notify(Exception::new("RuntimeError", "boom"));
        assert!(matches!(outcome, DeliveryOutcome::Suppressed));
    }

    #[test]
    fn missing_gateway_is_reported() {
        let notifier = Notifier::new(Configuration::default());
        let outcome = notifier.notify(Exception::new("RuntimeError", "boom"));
        assert!(matches!(outcome, DeliveryOutcome::NotConfigured));
    }

    #[test]
    fn context_lifecycle() {
        let notifier = Notifier::default();
        notifier.context([("user_id", 42)]);
        let notice = notifier.build_notice(&NoticeInput::new());
        assert_eq!(notice.context, Some(serde_json::json!({"user_id": 42})));

        notifier.clear_context();
        assert!(notifier.build_notice(&NoticeInput::new()).context.is_none());
    }
}
