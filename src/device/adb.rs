//! ADB-backed device control
//!
//! Drives a BlueStacks/emulator instance through the `adb` binary:
//! `exec-out screencap -p` for capture, `input swipe` for taps and drags.
//! The physical resolution is probed once at connect time and used to map
//! normalized coordinates to pixels.

use std::process::Command;
use std::time::Duration;

use image::RgbaImage;

use super::{DeviceControl, DeviceError};
use crate::vision::{Frame, Point};

/// Android package name for Rise of Kingdoms (global build)
pub const GAME_PACKAGE: &str = "com.lilithgames.roc.gp";

/// Device control channel over the `adb` command-line tool
pub struct AdbDevice {
    adb_path: String,
    serial: Option<String>,
    width: u32,
    height: u32,
}

impl AdbDevice {
    /// Connect to a device and probe its screen resolution
    ///
    /// `serial` selects a specific device; `None` uses adb's default.
    pub fn connect(adb_path: &str, serial: Option<&str>) -> Result<Self, DeviceError> {
        let mut device = Self {
            adb_path: adb_path.to_string(),
            serial: serial.map(|s| s.to_string()),
            width: 0,
            height: 0,
        };

        let raw = device.run(&["shell", "wm", "size"])?;
        let text = String::from_utf8_lossy(&raw);
        let (width, height) = parse_wm_size(&text)
            .ok_or_else(|| DeviceError::Adb(format!("unparseable wm size output: {text}")))?;
        device.width = width;
        device.height = height;

        log::info!(
            "Connected to device{} at {width}x{height}",
            device
                .serial
                .as_deref()
                .map(|s| format!(" {s}"))
                .unwrap_or_default()
        );
        Ok(device)
    }

    /// Launch the game when it is not already in the foreground
    pub fn start_game(&mut self) -> Result<(), DeviceError> {
        self.run(&[
            "shell", "monkey", "-p", GAME_PACKAGE, "-c",
            "android.intent.category.LAUNCHER", "1",
        ])?;
        Ok(())
    }

    /// Screen resolution probed at connect time
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn to_pixels(&self, point: Point) -> (u32, u32) {
        let p = point.clamped();
        let x = (p.x * self.width.saturating_sub(1) as f32).round() as u32;
        let y = (p.y * self.height.saturating_sub(1) as f32).round() as u32;
        (x, y)
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        let mut command = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            command.arg("-s").arg(serial);
        }
        let output = command.args(args).output()?;
        if !output.status.success() {
            return Err(DeviceError::Adb(format!(
                "adb {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl DeviceControl for AdbDevice {
    fn capture_frame(&mut self) -> Result<Frame, DeviceError> {
        if self.width == 0 {
            return Err(DeviceError::NotConnected);
        }
        let png = self.run(&["exec-out", "screencap", "-p"])?;
        let image: RgbaImage = image::load_from_memory(&png)
            .map_err(|e| DeviceError::Decode(e.to_string()))?
            .to_rgba8();
        Ok(Frame::new(image))
    }

    fn tap(&mut self, point: Point, duration: Duration) -> Result<(), DeviceError> {
        let (x, y) = self.to_pixels(point);
        // `input swipe` with identical endpoints gives a tap with hold time
        let ms = duration.as_millis().max(1).to_string();
        let (xs, ys) = (x.to_string(), y.to_string());
        self.run(&["shell", "input", "swipe", &xs, &ys, &xs, &ys, &ms])?;
        log::debug!("Tapped ({x}, {y}) for {ms}ms");
        Ok(())
    }

    fn swipe(&mut self, path: &[Point], total: Duration) -> Result<(), DeviceError> {
        if path.len() < 2 {
            return Ok(());
        }
        // adb only swipes straight lines, so a curved path becomes a chain
        // of short segments with the duration split evenly
        let segments = (path.len() - 1) as u32;
        let per_segment = (total / segments).as_millis().max(1).to_string();
        for pair in path.windows(2) {
            let (x1, y1) = self.to_pixels(pair[0]);
            let (x2, y2) = self.to_pixels(pair[1]);
            let (x1, y1, x2, y2) = (
                x1.to_string(),
                y1.to_string(),
                x2.to_string(),
                y2.to_string(),
            );
            self.run(&["shell", "input", "swipe", &x1, &y1, &x2, &y2, &per_segment])?;
        }
        Ok(())
    }
}

fn parse_wm_size(output: &str) -> Option<(u32, u32)> {
    // Prefer the override size when present, e.g.
    //   Physical size: 1080x1920
    //   Override size: 1920x1080
    let mut parsed = None;
    for line in output.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let dims = value.trim().split_once('x').and_then(|(w, h)| {
            Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?))
        });
        if let Some(dims) = dims {
            if label.trim().eq_ignore_ascii_case("Override size") {
                return Some(dims);
            }
            parsed = Some(dims);
        }
    }
    parsed
}
