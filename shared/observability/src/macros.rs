//! Convenience macros for common logging patterns in PanelHub.

/// Log a timed operation (measures and logs duration)
#[macro_export]
macro_rules! log_timed {
    ($name:expr, $block:expr) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration_us = start.elapsed().as_micros() as u64;
        tracing::debug!(target: "timing", operation = $name, duration_us = duration_us, "operation completed");
        result
    }};
}

/// Log a repository operation
#[macro_export]
macro_rules! log_store {
    ($operation:expr, $collection:expr) => {
        tracing::debug!(target: "store", operation = $operation, collection = $collection, "store operation");
    };
    ($operation:expr, $collection:expr, $id:expr) => {
        tracing::debug!(target: "store", operation = $operation, collection = $collection, id = %$id, "store operation");
    };
}

/// Log a pricing rule check
#[macro_export]
macro_rules! log_rule {
    ($rule:expr, applied, $subject:expr) => {
        tracing::trace!(target: "rules", rule = $rule, subject = %$subject, result = "applied", "rule applied");
    };
    ($rule:expr, skipped, $subject:expr, $reason:expr) => {
        tracing::trace!(target: "rules", rule = $rule, subject = %$subject, result = "skipped", reason = $reason, "rule skipped");
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        let value = log_timed!("sum", 1 + 2);
        assert_eq!(value, 3);

        log_store!("list", "subscriptions");
        log_store!("get", "subscriptions", "42");

        log_rule!("addon_surcharge", applied, "premium");
        log_rule!("addon_surcharge", skipped, "light", "plan excluded");
    }
}
