//! Process-wide tracing for chirpy.
//!
//! Console logs are always on, as text or JSON lines. Spans are also exported
//! over OTLP gRPC when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{anyhow, bail, Context, Result};
use clap::{builder::PossibleValue, ValueEnum};
use opentelemetry::{
    global, propagation::TextMapCompositePropagator, trace::TracerProvider as _, KeyValue,
};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::{env, sync::OnceLock, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;

use crate::GIT_COMMIT_HASH;

const DEFAULT_SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Added after `RUST_LOG`, so they win over it.
const QUIET_TARGETS: &[&str] = &[
    "hyper=error",
    "h2=warn",
    "tokio=error",
    "tower=warn",
    "tonic=warn",
    "sqlx=warn",
    "opentelemetry_sdk=warn",
];

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ValueEnum for LogFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Text, Self::Json]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Text => PossibleValue::new("text"),
            Self::Json => PossibleValue::new("json"),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// `None` logs errors only.
    pub verbosity: Option<Level>,
    pub format: LogFormat,
}

fn filter(verbosity: Option<Level>) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(verbosity.unwrap_or(Level::ERROR).into())
        .from_env_lossy();
    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

// "key=value,key=value"; keys are lowercased, binary ("-bin") keys are refused.
fn parse_metadata(raw: &str) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();

    for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("OTEL_EXPORTER_OTLP_HEADERS entry {pair:?} has no '='"))?;
        let key = key.trim().to_ascii_lowercase();
        if key.ends_with("-bin") {
            bail!("binary OTLP header {key} is not supported");
        }

        let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
            .map_err(|e| anyhow!("invalid OTLP header name {key}: {e}"))?;
        let value: MetadataValue<Ascii> = value
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid OTLP header value for {key}: {e}"))?;
        metadata.insert(name, value);
    }

    Ok(metadata)
}

fn with_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn tls_host(endpoint: &str) -> Option<&str> {
    endpoint
        .strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .and_then(|authority| authority.split(':').next())
        .filter(|host| !host.is_empty())
}

/// OTLP collector settings read from the standard `OTEL_*` variables.
#[derive(Debug)]
struct Exporter {
    endpoint: String,
    tls_host: Option<String>,
    metadata: MetadataMap,
    service_name: String,
    instance_id: String,
}

impl Exporter {
    fn from_env() -> Result<Option<Self>> {
        let Some(endpoint) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty())
        else {
            return Ok(None);
        };

        if let Ok(protocol) = env::var("OTEL_EXPORTER_OTLP_PROTOCOL") {
            if protocol != "grpc" {
                bail!("OTEL_EXPORTER_OTLP_PROTOCOL={protocol} is not supported, use grpc");
            }
        }

        let endpoint = with_scheme(endpoint.trim());
        let tls_host = tls_host(&endpoint).map(ToString::to_string);
        let metadata = match env::var("OTEL_EXPORTER_OTLP_HEADERS") {
            Ok(raw) => parse_metadata(&raw)?,
            Err(_) => MetadataMap::new(),
        };

        Ok(Some(Self {
            endpoint,
            tls_host,
            metadata,
            service_name: env::var("OTEL_SERVICE_NAME")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            instance_id: env::var("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|_| Ulid::new().to_string()),
        }))
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes([
                KeyValue::new("service.name", self.service_name.clone()),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id.clone()),
                KeyValue::new("vcs.ref.head.revision", GIT_COMMIT_HASH),
            ])
            .build()
    }

    fn install(self) -> Result<Tracer> {
        let resource = self.resource();

        let mut builder = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT);
        if let Some(host) = self.tls_host {
            builder = builder.with_tls_config(
                ClientTlsConfig::new()
                    .domain_name(host)
                    .with_native_roots(),
            );
        }
        if !self.metadata.is_empty() {
            builder = builder.with_metadata(self.metadata);
        }
        let exporter = builder
            .build()
            .with_context(|| format!("failed to build OTLP exporter for {}", self.endpoint))?;

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build();

        let _ = TRACER_PROVIDER.set(provider.clone());
        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]));

        Ok(provider.tracer(DEFAULT_SERVICE_NAME))
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Invalid `OTEL_*` settings, or a subscriber already installed.
pub fn init(options: Options) -> Result<()> {
    let (text, json) = match options.format {
        LogFormat::Text => (Some(fmt::layer().with_target(false)), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_current_span(true).with_span_list(false)),
        ),
    };

    let otel = match Exporter::from_env()? {
        Some(exporter) => Some(tracing_opentelemetry::layer().with_tracer(exporter.install()?)),
        None => None,
    };

    let subscriber = Registry::default()
        .with(filter(options.verbosity)?)
        .with(text)
        .with(json)
        .with(otel);
    tracing::subscriber::set_global_default(subscriber)
        .context("tracing subscriber already installed")?;

    Ok(())
}

/// Flush pending spans. Noop when nothing is exported.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("flushing span exporter");
        let _ = provider.shutdown();
    }
}
