//! Warden CLI entry point
//!
//! Wires configuration, device, license and stats together and runs the
//! scheduler on the main thread. A small stdin reader doubles as the
//! control surface: `pause`, `resume`, `stop`, `enable <task>`,
//! `disable <task>`, `priority <task> <value>`.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use rok_warden::config::Settings;
use rok_warden::control::{self, ControlHandle, ControlSignal};
use rok_warden::device::AdbDevice;
use rok_warden::license::{FileLicense, LicenseGate, UnlimitedLicense};
use rok_warden::scheduler::Scheduler;
use rok_warden::stats::JsonlSink;
use rok_warden::stealth::Humanizer;
use rok_warden::vision::TemplateStore;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("warden.json"));

    let settings = if config_path.exists() {
        Settings::load(&config_path)?
    } else {
        log::warn!(
            "Config file '{}' not found, using defaults",
            config_path.display()
        );
        Settings::default()
    };

    let templates = TemplateStore::load_dir(&settings.template_dir)?;
    log::info!(
        "Loaded {} templates from '{}'",
        templates.len(),
        settings.template_dir.display()
    );

    let license: Box<dyn LicenseGate> = match &settings.license_file {
        Some(path) => {
            let license = FileLicense::load(path)?;
            if !license.is_valid() {
                return Err("license has expired".into());
            }
            log::info!(
                "License valid for {}h",
                license.remaining_time().as_secs() / 3600
            );
            Box::new(license)
        }
        None => {
            log::warn!("No license file configured, running unrestricted");
            Box::new(UnlimitedLicense)
        }
    };

    let mut device = AdbDevice::connect(&settings.device.adb_path, settings.device.serial.as_deref())?;
    let (width, height) = device.resolution();
    log::info!("Device connected at {width}x{height}");
    device.start_game()?;

    let humanizer = match settings.seed {
        Some(seed) => {
            log::warn!("Running with fixed seed {seed}");
            Humanizer::with_seed(settings.humanizer.clone(), seed)
        }
        None => Humanizer::new(settings.humanizer.clone()),
    };

    let stats = JsonlSink::create(&settings.stats_dir)?;
    let (handle, receiver) = control::channel();
    spawn_stdin_reader(handle);

    let mut scheduler = Scheduler::new(
        settings.scheduler.clone(),
        settings.build_registry(),
        templates,
        humanizer,
        Box::new(device),
        license,
        Box::new(stats),
        receiver,
        settings.seed,
    );
    scheduler.run();
    Ok(())
}

/// Read operator commands from stdin and forward them as control signals
fn spawn_stdin_reader(handle: ControlHandle) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(signal) = parse_command(line.trim()) {
                handle.send(signal);
            } else if !line.trim().is_empty() {
                eprintln!("unknown command: {}", line.trim());
            }
        }
    });
}

fn parse_command(line: &str) -> Option<ControlSignal> {
    let mut parts = line.split_whitespace();
    match (parts.next()?, parts.next(), parts.next()) {
        ("pause", None, _) => Some(ControlSignal::Pause),
        ("resume", None, _) => Some(ControlSignal::Resume),
        ("stop" | "quit", None, _) => Some(ControlSignal::Stop),
        ("enable", Some(task), None) => Some(ControlSignal::SetTaskEnabled {
            task: task.to_string(),
            enabled: true,
        }),
        ("disable", Some(task), None) => Some(ControlSignal::SetTaskEnabled {
            task: task.to_string(),
            enabled: false,
        }),
        ("priority", Some(task), Some(value)) => {
            let priority = value.parse().ok()?;
            Some(ControlSignal::SetTaskPriority {
                task: task.to_string(),
                priority,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("pause"), Some(ControlSignal::Pause));
        assert_eq!(parse_command("quit"), Some(ControlSignal::Stop));
        assert_eq!(
            parse_command("disable barbarian"),
            Some(ControlSignal::SetTaskEnabled {
                task: "barbarian".into(),
                enabled: false,
            })
        );
        assert_eq!(
            parse_command("priority gather 2.5"),
            Some(ControlSignal::SetTaskPriority {
                task: "gather".into(),
                priority: 2.5,
            })
        );
        assert_eq!(parse_command("priority gather"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("dance"), None);
    }
}
