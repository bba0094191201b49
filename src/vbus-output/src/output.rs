use crate::bus::{BusConnector, BusPublisher};
use crate::nats::NatsConnector;
use bytes::Bytes;
use tokio::runtime::{Builder, Runtime};
use vbus_core::{
    AudioOutput, BackendSettings, Config, Element, OutputError, OutputResult, SampleFormat,
    StreamFormat, Topics,
};

pub const OUTPUT_NAME: &str = "vbus-source";

const HELP: &str = "    vbus-source takes no arguments";

/// Output backend that republishes playback events on the vbus.
///
/// The connection is opened once in `init` and kept until the value is
/// dropped. Without a connection every event is dropped.
pub struct VbusOutput {
    config: Config,
    topics: Topics,
    connector: Box<dyn BusConnector>,
    url_override: Option<String>,
    publisher: Option<Box<dyn BusPublisher>>,
    runtime: Runtime,
}

impl std::fmt::Debug for VbusOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VbusOutput")
            .field("topics", &self.topics)
            .field("url_override", &self.url_override)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl VbusOutput {
    /// Output publishing over NATS.
    pub fn new(config: Config) -> OutputResult<Self> {
        let connector = NatsConnector::from_config(&config);
        Self::with_connector(config, connector)
    }

    pub fn with_connector(
        config: Config,
        connector: impl BusConnector + 'static,
    ) -> OutputResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("vbus-io")
            .enable_all()
            .build()
            .map_err(|e| OutputError::Backend(format!("failed to start io runtime: {e}")))?;

        Ok(Self {
            topics: Topics::from_config(&config),
            config,
            connector: Box::new(connector),
            url_override: None,
            publisher: None,
            runtime,
        })
    }

    /// Use `url` instead of `VBUS_URL` / `bus.url`.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url_override = Some(url.into());
        self
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn is_connected(&self) -> bool {
        self.publisher.is_some()
    }

    fn resolve_url(&self) -> String {
        self.url_override
            .clone()
            .unwrap_or_else(|| self.config.bus_url_from_env())
    }

    fn connect(&mut self) {
        let url = self.resolve_url();
        let connected = self.runtime.block_on(self.connector.connect(&url));
        match connected {
            Ok(publisher) => {
                tracing::info!("Start nats on {url}");
                self.publisher = Some(publisher);
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to start bus connection; events will be dropped");
            }
        }
    }

    fn announce(&self) {
        let element = Element::from_config(&self.config.element);
        match element.to_json() {
            Ok(json) => self.publish(&self.topics.registration, Bytes::from(json)),
            Err(err) => tracing::warn!(error = %err, "failed to encode registration element"),
        }
    }

    fn publish(&self, subject: &str, payload: Bytes) {
        let Some(publisher) = self.publisher.as_deref() else {
            tracing::trace!(subject, "not connected, dropping message");
            return;
        };
        if let Err(err) = self.runtime.block_on(publisher.publish(subject, payload)) {
            tracing::debug!(error = %err, "publish dropped");
        }
    }
}

impl AudioOutput for VbusOutput {
    fn name(&self) -> &str {
        OUTPUT_NAME
    }

    fn help(&self) -> &'static str {
        HELP
    }

    fn init(&mut self, args: &[String]) -> OutputResult<BackendSettings> {
        if !args.is_empty() {
            tracing::debug!(?args, "ignoring backend arguments");
        }
        let settings = BackendSettings::from(&self.config.audio);

        self.connect();
        self.announce();

        Ok(settings)
    }

    fn deinit(&mut self) {
        // The connection stays open; only push out what is still buffered.
        if let Some(publisher) = self.publisher.as_deref() {
            if let Err(err) = self.runtime.block_on(publisher.flush()) {
                tracing::debug!(error = %err, "flush on deinit failed");
            }
        }
    }

    fn start(&mut self, sample_rate: i32, sample_format: SampleFormat) {
        tracing::debug!(rate = sample_rate, format = %sample_format, "stream start");
        let payload = StreamFormat {
            rate: sample_rate,
            format: sample_format,
        };
        match serde_json::to_vec(&payload) {
            Ok(json) => self.publish(&self.topics.start, Bytes::from(json)),
            Err(err) => tracing::warn!(error = %err, "failed to encode stream format"),
        }
    }

    fn play(&mut self, buffer: &[u8], sample_count: usize) {
        tracing::trace!(bytes = buffer.len(), frames = sample_count, "play");
        self.publish(&self.topics.play, Bytes::copy_from_slice(buffer));
    }

    fn stop(&mut self) {
        tracing::debug!("stream stop");
        self.publish(&self.topics.stop, Bytes::new());
    }
}
