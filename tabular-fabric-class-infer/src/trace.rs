use std::collections::BTreeMap;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::level_filters::LevelFilter;
use tracing::Metadata;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

pub struct ServeLayer {
    app: String,
    log_type: String,
    json: bool,
    tz: Tz,
    level: LevelFilter,
}

impl ServeLayer {
    /// Unknown timezones fall back to UTC, unknown levels to INFO.
    pub fn new(app: &str, log_type: &str, log_format: &str, tz: &str, level: &str) -> Self {
        Self {
            app: app.to_string(),
            log_type: log_type.to_string(),
            json: log_format.eq_ignore_ascii_case("json"),
            tz: tz.parse().unwrap_or(Tz::UTC),
            level: parse_level(level).unwrap_or(LevelFilter::INFO),
        }
    }

    fn format_line(
        &self,
        ts: &str,
        level: &str,
        target: &str,
        mut fields: BTreeMap<String, serde_json::Value>,
    ) -> String {
        let msg = match fields.remove("message") {
            Some(serde_json::Value::String(msg)) => msg,
            Some(other) => other.to_string(),
            None => "".to_string(),
        };

        if self.json {
            let output = serde_json::json!({
                "_TS_": ts,
                "_MSM_": msg,
                "_LEVEL_": level,
                "_CALLER_": target,
                "_FIELDS_": fields,
                "_APP_": self.app,
                "_TYPE_": self.log_type,
            });
            output.to_string()
        } else if fields.is_empty() {
            format!("{} [{}] {} -- {}", ts, level, msg, target)
        } else {
            let extra = fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{} [{}] {} {} -- {}", ts, level, msg, extra, target)
        }
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

impl<S> Layer<S> for ServeLayer
where
    S: tracing::Subscriber,
{
    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(self.level)
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.level >= *metadata.level()
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        let mut visitor = JsonVisitor(&mut fields);
        event.record(&mut visitor);

        let ts = Utc::now()
            .with_timezone(&self.tz)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let metadata = event.metadata();
        println!(
            "{}",
            self.format_line(&ts, metadata.level().as_str(), metadata.target(), fields)
        );
    }
}

/// Install a [`ServeLayer`] as the global subscriber.
pub fn init(app: &str, log_format: &str, tz: &str, level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    tracing_subscriber::registry()
        .with(ServeLayer::new(app, "general", log_format, tz, level))
        .init();
}

struct JsonVisitor<'a>(&'a mut BTreeMap<String, serde_json::Value>);

impl<'a> tracing::field::Visit for JsonVisitor<'a> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(value.to_string()),
        );
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
