use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;
use vbus_core::{init_logging, AppDirs, AudioOutput, Config, Element, SampleFormat};
use vbus_output::VbusOutput;

#[derive(Debug, Parser)]
#[command(
    name = "vbus-source",
    version,
    about = "Publish AirPlay audio on the vbus",
    disable_help_subcommand = true
)]
struct Cli {
    /// Bus URL override (takes precedence over VBUS_URL and config)
    #[arg(long, global = true)]
    url: Option<String>,
    /// Config file to load instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the backend's usage line
    Help,
    /// Print the registration element announced on init
    Describe,
    /// Stream raw PCM from stdin through the backend
    Run(RunCommand),
}

#[derive(Debug, Parser, Clone)]
struct RunCommand {
    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    rate: i32,
    /// Sample format code (3 = S16)
    #[arg(long, default_value_t = 3)]
    format: i32,
    /// Interleaved channel count
    #[arg(long, default_value_t = 2)]
    channels: usize,
    /// Bytes per frame; required when the format has no fixed sample size
    #[arg(long)]
    frame_bytes: Option<usize>,
    /// Frames handed to each play call
    #[arg(long, default_value_t = 352)]
    chunk_frames: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum RunError {
    #[error("format {0} has no fixed sample size; pass --frame-bytes")]
    UnknownFrameSize(String),
    #[error("--{0} must be greater than zero")]
    Zero(&'static str),
    #[error("a chunk of {frames} frames does not fit in memory")]
    ChunkTooLarge { frames: usize },
}

impl RunCommand {
    fn sample_format(&self) -> SampleFormat {
        SampleFormat::from_code(self.format)
    }

    fn frame_bytes(&self) -> Result<usize, RunError> {
        if self.chunk_frames == 0 {
            return Err(RunError::Zero("chunk-frames"));
        }
        let bytes = match self.frame_bytes {
            Some(bytes) => bytes,
            None => {
                if self.channels == 0 {
                    return Err(RunError::Zero("channels"));
                }
                let format = self.sample_format();
                format
                    .bytes_per_sample()
                    .ok_or_else(|| RunError::UnknownFrameSize(format.to_string()))?
                    .checked_mul(self.channels)
                    .ok_or(RunError::ChunkTooLarge {
                        frames: self.chunk_frames,
                    })?
            }
        };
        if bytes == 0 {
            return Err(RunError::Zero("frame-bytes"));
        }
        // The read buffer holds one whole chunk.
        match bytes.checked_mul(self.chunk_frames) {
            Some(chunk) if chunk <= isize::MAX as usize => Ok(bytes),
            _ => Err(RunError::ChunkTooLarge {
                frames: self.chunk_frames,
            }),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let config = match &cli.config {
        Some(path) => {
            dirs.ensure_exists()?;
            Config::load_required(path)?
        }
        None => Config::load_or_default(&dirs)?,
    };
    let _logging = init_logging(&config.logging, &dirs)?;

    match cli.command {
        Command::Help => {
            let output = VbusOutput::new(config)?;
            println!("{}", output.help());
        }
        Command::Describe => {
            let element = Element::from_config(&config.element);
            println!("{}", serde_json::to_string_pretty(&element)?);
        }
        Command::Run(run) => {
            let frame_bytes = run.frame_bytes()?;
            let mut output = VbusOutput::new(config)?;
            if let Some(url) = cli.url {
                output = output.with_url(url);
            }
            let stats = stream(&mut output, &run, frame_bytes, io::stdin().lock())?;
            tracing::info!(
                chunks = stats.chunks,
                bytes = stats.bytes,
                "stream finished"
            );
        }
    }

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct StreamStats {
    chunks: usize,
    bytes: usize,
}

/// Drive one full session: init, start, play per chunk until EOF, stop, deinit.
fn stream<O: AudioOutput, R: Read>(
    output: &mut O,
    run: &RunCommand,
    frame_bytes: usize,
    mut input: R,
) -> io::Result<StreamStats> {
    let args: Vec<String> = std::env::args().take(1).collect();
    if let Err(err) = output.init(&args) {
        return Err(io::Error::other(err));
    }
    output.start(run.rate, run.sample_format());

    let mut stats = StreamStats::default();
    let mut chunk = vec![0u8; frame_bytes * run.chunk_frames];
    let result = loop {
        match read_chunk(&mut input, &mut chunk) {
            Ok(0) => break Ok(()),
            Ok(len) => {
                output.play(&chunk[..len], len / frame_bytes);
                stats.chunks += 1;
                stats.bytes += len;
            }
            Err(err) => break Err(err),
        }
    };

    output.stop();
    output.deinit();
    result.map(|()| stats)
}

/// Fill `buf` as far as the reader allows; a short count means EOF.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use vbus_core::{BackendSettings, OutputResult};

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl AudioOutput for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn help(&self) -> &'static str {
            ""
        }

        fn init(&mut self, _args: &[String]) -> OutputResult<BackendSettings> {
            self.calls.push("init".into());
            Ok(BackendSettings {
                buffer_desired_length: 1.0,
                latency_offset: 0.0,
            })
        }

        fn deinit(&mut self) {
            self.calls.push("deinit".into());
        }

        fn start(&mut self, sample_rate: i32, sample_format: SampleFormat) {
            self.calls
                .push(format!("start {sample_rate} {}", sample_format.code()));
        }

        fn play(&mut self, buffer: &[u8], sample_count: usize) {
            self.calls
                .push(format!("play {} {sample_count}", buffer.len()));
        }

        fn stop(&mut self) {
            self.calls.push("stop".into());
        }
    }

    fn run_command() -> RunCommand {
        RunCommand {
            rate: 44100,
            format: 3,
            channels: 2,
            frame_bytes: None,
            chunk_frames: 4,
        }
    }

    #[test]
    fn frame_size_from_format() {
        assert_eq!(run_command().frame_bytes(), Ok(4));

        let mut run = run_command();
        run.format = 9;
        assert_eq!(run.frame_bytes(), Ok(6));
    }

    #[test]
    fn unknown_format_needs_frame_bytes() {
        let mut run = run_command();
        run.format = 14;
        assert!(matches!(run.frame_bytes(), Err(RunError::UnknownFrameSize(_))));

        run.frame_bytes = Some(8);
        assert_eq!(run.frame_bytes(), Ok(8));
    }

    #[test]
    fn oversized_chunk_rejected() {
        let mut run = run_command();
        run.chunk_frames = usize::MAX;
        assert_eq!(
            run.frame_bytes(),
            Err(RunError::ChunkTooLarge { frames: usize::MAX })
        );

        let mut run = run_command();
        run.frame_bytes = Some(usize::MAX / 2);
        run.chunk_frames = 3;
        assert_eq!(run.frame_bytes(), Err(RunError::ChunkTooLarge { frames: 3 }));

        let mut run = run_command();
        run.channels = usize::MAX;
        assert!(matches!(
            run.frame_bytes(),
            Err(RunError::ChunkTooLarge { .. })
        ));
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut run = run_command();
        run.chunk_frames = 0;
        assert_eq!(run.frame_bytes(), Err(RunError::Zero("chunk-frames")));

        let mut run = run_command();
        run.frame_bytes = Some(0);
        assert_eq!(run.frame_bytes(), Err(RunError::Zero("frame-bytes")));
    }

    #[test]
    fn stream_drives_full_lifecycle() {
        let mut recorder = Recorder::default();
        let input = Cursor::new(vec![7u8; 40]);

        let stats = stream(&mut recorder, &run_command(), 4, input).unwrap();

        assert_eq!(stats, StreamStats { chunks: 3, bytes: 40 });
        assert_eq!(
            recorder.calls,
            vec![
                "init",
                "start 44100 3",
                "play 16 4",
                "play 16 4",
                "play 8 2",
                "stop",
                "deinit",
            ]
        );
    }

    #[test]
    fn empty_input_still_starts_and_stops() {
        let mut recorder = Recorder::default();
        let stats = stream(&mut recorder, &run_command(), 4, io::empty()).unwrap();
        assert_eq!(stats, StreamStats::default());
        assert_eq!(recorder.calls, vec!["init", "start 44100 3", "stop", "deinit"]);
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "vbus-source",
            "--url",
            "nats://localhost:4222",
            "run",
            "--rate",
            "48000",
            "--chunk-frames",
            "1024",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("nats://localhost:4222"));
        match cli.command {
            Command::Run(run) => {
                assert_eq!(run.rate, 48000);
                assert_eq!(run.format, 3);
                assert_eq!(run.chunk_frames, 1024);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }
}
