//! Observability: Distributed Tracing, Metrics, and Logging.

use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the observability stack.
pub fn init(service_name: &str, config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    // Set up OpenTelemetry tracing if endpoint is provided
    if let Some(endpoint) = config.otlp_endpoint.as_deref() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(
                opentelemetry_sdk::trace::config()
                    .with_resource(opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", service_name.to_string()),
                    ])),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;

        let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        if config.json_logging {
            tracing_subscriber::registry()
                .with(filter)
                .with(telemetry_layer)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(telemetry_layer)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    } else if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

/// Shutdown OpenTelemetry.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Metrics registry and helpers.
pub mod metrics {
    use metrics::{describe_counter, describe_histogram, histogram};

    /// Register all metric descriptions.
    pub fn register_metrics() {
        describe_counter!(
            "taskforge_authz_decisions_total",
            "Authorization decisions, labeled by resource, action, and outcome"
        );
        describe_counter!(
            "taskforge_auth_failures_total",
            "Requests rejected during token verification, labeled by reason"
        );
        describe_counter!(
            "taskforge_fact_timeouts_total",
            "Ownership-fact lookups that exceeded the deadline and failed closed"
        );
        describe_counter!(
            "taskforge_errors_total",
            "Errors returned to clients, labeled by code and category"
        );
        describe_counter!(
            "taskforge_logins_total",
            "Login attempts, labeled by outcome"
        );
        describe_counter!(
            "taskforge_attachments_stored_total",
            "Attachments accepted and written to storage"
        );

        describe_histogram!(
            "taskforge_request_duration_seconds",
            "HTTP request duration in seconds"
        );
        describe_histogram!(
            "taskforge_attachment_bytes",
            "Size of accepted attachments in bytes"
        );
    }

    /// Record an accepted attachment.
    pub fn record_attachment(size_bytes: u64) {
        metrics::counter!("taskforge_attachments_stored_total").increment(1);
        histogram!("taskforge_attachment_bytes").record(size_bytes as f64);
    }
}

/// Structured event types for logging.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event_type")]
pub enum ForgeEvent {
    LoginSucceeded {
        user_id: String,
        role: String,
    },
    LoginFailed {
        username: String,
        reason: String,
    },
    TokensRefreshed {
        user_id: String,
        role: String,
    },
    AccessDenied {
        actor_id: String,
        resource: String,
        action: String,
        reason: String,
    },
    UserDeactivated {
        user_id: String,
        by: String,
    },
    RoleChanged {
        user_id: String,
        new_role: String,
        by: String,
    },
    AttachmentStored {
        task_id: String,
        filename: String,
        size_bytes: u64,
    },
}

impl ForgeEvent {
    /// Log this event.
    pub fn log(&self) {
        match self {
            ForgeEvent::LoginSucceeded { user_id, role } => {
                tracing::info!(user_id = %user_id, role = %role, "Login succeeded");
            }
            ForgeEvent::LoginFailed { username, reason } => {
                tracing::warn!(username = %username, reason = %reason, "Login failed");
            }
            ForgeEvent::TokensRefreshed { user_id, role } => {
                tracing::info!(user_id = %user_id, role = %role, "Tokens refreshed");
            }
            ForgeEvent::AccessDenied { actor_id, resource, action, reason } => {
                tracing::warn!(
                    actor_id = %actor_id,
                    resource = %resource,
                    action = %action,
                    reason = %reason,
                    "Access denied"
                );
            }
            ForgeEvent::UserDeactivated { user_id, by } => {
                tracing::info!(user_id = %user_id, by = %by, "User deactivated");
            }
            ForgeEvent::RoleChanged { user_id, new_role, by } => {
                tracing::info!(user_id = %user_id, new_role = %new_role, by = %by, "Role changed");
            }
            ForgeEvent::AttachmentStored { task_id, filename, size_bytes } => {
                tracing::info!(
                    task_id = %task_id,
                    filename = %filename,
                    size_bytes = %size_bytes,
                    "Attachment stored"
                );
            }
        }
    }
}
