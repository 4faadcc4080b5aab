//! Interactive karaoke session command.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use crossbeam_channel::{bounded, select, unbounded};
use echoloop_cli::{AppConfig, Command, SessionController, TerminalBars, controls};
use echoloop_io::CpalBackend;
use parking_lot::Mutex;

#[derive(Args)]
pub struct RunArgs {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device name (partial match)
    #[arg(long)]
    input: Option<String>,

    /// Output device name (partial match)
    #[arg(long)]
    output: Option<String>,

    /// Sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Buffer size
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Output gain in percent (0-150)
    #[arg(long)]
    gain: Option<f32>,

    /// Echo delay in seconds (0.0-1.0)
    #[arg(long)]
    delay: Option<f32>,

    /// Feedback gain (0.0-0.95)
    #[arg(long)]
    feedback: Option<f32>,

    /// Start the session immediately instead of waiting for `start`
    #[arg(long)]
    autostart: bool,
}

impl RunArgs {
    /// Loads the config file (or defaults) and applies flag overrides.
    fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };

        if let Some(input) = &self.input {
            config.audio.input_device = Some(input.clone());
        }
        if let Some(output) = &self.output {
            config.audio.output_device = Some(output.clone());
        }
        if let Some(sample_rate) = self.sample_rate {
            config.audio.sample_rate = sample_rate;
        }
        if let Some(buffer_size) = self.buffer_size {
            config.audio.buffer_size = buffer_size;
        }

        let mut snapshot = config.snapshot();
        if let Some(percent) = self.gain {
            snapshot.gain = percent / 100.0;
        }
        if let Some(delay) = self.delay {
            snapshot.delay_time_secs = delay;
        }
        if let Some(feedback) = self.feedback {
            snapshot.feedback_gain = feedback;
        }
        config.set_snapshot(snapshot);

        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    let backend = CpalBackend::try_new()?;
    let sink = Arc::new(Mutex::new(TerminalBars::new(std::io::stdout())));
    let mut session = SessionController::new(Box::new(backend), &config, sink);

    println!("echoloop karaoke echo");
    println!("  Sample rate: {} Hz", config.audio.sample_rate);
    println!("  Buffer size: {} samples", config.audio.buffer_size);
    println!("  {}", session.transport_hint());
    println!("  {}", session.readouts());
    println!("\n{}", controls::HELP);

    // Ctrl+C and stdin lines both feed the command loop.
    let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    let (line_tx, line_rx) = unbounded::<String>();
    std::thread::Builder::new()
        .name("echoloop-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    if args.autostart {
        let reply = controls::execute(&mut session, Command::Start);
        println!("\n{}", reply.message);
    } else {
        println!("\n{}", session.status());
    }

    loop {
        select! {
            recv(interrupt_rx) -> _ => {
                println!("\nStopping...");
                break;
            }
            recv(line_rx) -> line => {
                // stdin closed
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        let reply = controls::execute(&mut session, command);
                        println!("\n{}", reply.message);
                        if reply.quit {
                            return Ok(());
                        }
                    }
                    Err(err) => println!("\n{err}\n{}", controls::HELP),
                }
            }
        }
    }

    let _ = session.stop();
    println!("Done!");
    Ok(())
}
