//! Audio device listing command.

use clap::{Args, Subcommand};
use echoloop_io::{AudioBackend, AudioDevice, CpalBackend, detect_wireless_output};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all available audio devices
    List,

    /// Show default device information
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let backend = CpalBackend::try_new()?;

    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = backend.list_devices()?;

            if devices.is_empty() {
                println!("No audio devices found.");
                return Ok(());
            }

            println!("Available Audio Devices");
            println!("=======================\n");

            let inputs: Vec<_> = devices.iter().filter(|d| d.is_input).collect();
            if !inputs.is_empty() {
                println!("Microphones:");
                print_devices(&inputs, |d| d.is_output, " (also output)");
                println!();
            }

            let outputs: Vec<_> = devices.iter().filter(|d| d.is_output).collect();
            if !outputs.is_empty() {
                println!("Speakers:");
                print_devices(&outputs, |d| d.is_input, " (also input)");
                println!();
            }

            println!(
                "Total: {} input(s), {} output(s)",
                inputs.len(),
                outputs.len()
            );
            println!();
            println!("{}", detect_wireless_output(&devices).hint());
            println!();
            println!("Tip: Use a partial name with --input/--output:");
            println!("  echoloop run --input \"USB\" --output \"JBL\"");
        }

        DevicesCommand::Info => {
            println!("Default Audio Devices");
            println!("=====================\n");

            match backend.default_input_device()? {
                Some(device) => {
                    println!("Default Microphone:");
                    println!("  Name: {}", device.name);
                    println!("  Sample Rate: {} Hz", device.default_sample_rate);
                }
                None => println!("Default Microphone: None"),
            }
            println!();

            match backend.default_output_device()? {
                Some(device) => {
                    println!("Default Speakers:");
                    println!("  Name: {}", device.name);
                    println!("  Sample Rate: {} Hz", device.default_sample_rate);
                }
                None => println!("Default Speakers: None"),
            }
        }
    }

    Ok(())
}

fn print_devices(devices: &[&AudioDevice], also: impl Fn(&AudioDevice) -> bool, note: &str) {
    for (idx, device) in devices.iter().enumerate() {
        let suffix = if also(*device) { note } else { "" };
        println!(
            "  [{}] {} ({} Hz){}",
            idx, device.name, device.default_sample_rate, suffix
        );
    }
}
