//! vbus output backend for AirPlay receivers.
//!
//! [`VbusOutput`] implements [`vbus_core::AudioOutput`] and turns the player's
//! lifecycle callbacks into bus messages:
//!
//! | Callback | Subject | Payload |
//! |----------|---------|---------|
//! | `init` | `system.db.newElement` | registration [`vbus_core::Element`] (JSON) |
//! | `start` | `<path>.start` | `{"rate":44100,"format":3}` |
//! | `play` | `<path>.play` | raw PCM bytes |
//! | `stop` | `<path>.stop` | empty |
//!
//! # Usage
//!
//! ```rust,ignore
//! use vbus_core::{AudioOutput, Config, SampleFormat};
//! use vbus_output::VbusOutput;
//!
//! let mut output = VbusOutput::new(Config::default())?;
//! output.init(&[])?;
//! output.start(44100, SampleFormat::S16);
//! output.play(&pcm, pcm.len() / 4);
//! output.stop();
//! output.deinit();
//! ```

pub mod bus;
mod nats;
mod output;

pub use bus::{BusConnector, BusError, BusPublisher, BusResult, MemoryBus, Message};
pub use nats::{NatsConnector, NatsPublisher};
pub use output::{VbusOutput, OUTPUT_NAME};
