use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    cache::{METRIC_EVICT, METRIC_EXPIRED, METRIC_HIT, METRIC_MISS},
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::Telemetry(err.to_string()))
}

/// Register descriptions for the counters emitted by the response cache.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT,
            Unit::Count,
            "Total number of index pages served from the response cache."
        );
        describe_counter!(
            METRIC_MISS,
            Unit::Count,
            "Total number of response-cache lookups with no stored page."
        );
        describe_counter!(
            METRIC_EXPIRED,
            Unit::Count,
            "Total number of stored pages discarded after their TTL ran out."
        );
        describe_counter!(
            METRIC_EVICT,
            Unit::Count,
            "Total number of response-cache evictions due to capacity."
        );
    });
}
