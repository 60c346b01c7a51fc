//! End-to-end scheduler tests against a scripted device
//!
//! These run the real loop (real matcher, real humanizer with all delays
//! collapsed) with a fake device channel, so every outcome path is
//! exercised without an emulator attached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{GrayImage, ImageBuffer, Rgba, RgbaImage};

use rok_warden::config::SchedulerConfig;
use rok_warden::control::{self, ControlHandle};
use rok_warden::device::{DeviceControl, DeviceError};
use rok_warden::license::LicenseGate;
use rok_warden::scheduler::{Scheduler, TaskDescriptor};
use rok_warden::stats::{ActionEvent, MemorySink, StatsSink};
use rok_warden::stealth::{Humanizer, HumanizerConfig};
use rok_warden::tasks::{
    AbortCause, ActionOutcome, GatherTask, HealTask, HelpTask, Task, UpgradeTask,
};
use rok_warden::vision::{Frame, Point, Template, TemplateStore};

const PATCH: u32 = 16;

/// Deterministic textured pattern; different seeds are uncorrelated
fn pat(seed: u32, x: u32, y: u32) -> u8 {
    let h = (x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ seed.wrapping_mul(101))
        .wrapping_mul(2_654_435_761);
    (h >> 24) as u8
}

fn template(name: &str, seed: u32) -> Template {
    let image: GrayImage = ImageBuffer::from_fn(PATCH, PATCH, |x, y| image::Luma([pat(seed, x, y)]));
    Template {
        name: name.to_string(),
        image,
        threshold: 0.8,
        region: None,
    }
}

/// A 200x100 screen showing the given patches at fixed positions
fn screen(patches: &[(u32, u32, u32)]) -> RgbaImage {
    ImageBuffer::from_fn(200, 100, |x, y| {
        for &(seed, px, py) in patches {
            if (px..px + PATCH).contains(&x) && (py..py + PATCH).contains(&y) {
                let v = pat(seed, x - px, y - py);
                return Rgba([v, v, v, 255]);
            }
        }
        Rgba([128, 128, 128, 255])
    })
}

const HOSPITAL: u32 = 1;
const HEAL_ALL: u32 = 2;
const CONFIRM_HEAL: u32 = 3;
const ALLIANCE: u32 = 4;
const HELP_ALL: u32 = 5;
const MAP: u32 = 6;
const SEARCH: u32 = 7;
const UPGRADE_IND: u32 = 8;
const UPGRADE_BTN: u32 = 9;

fn store() -> TemplateStore {
    TemplateStore::from_templates(
        vec![
            template("hospital", HOSPITAL),
            template("heal_all_button", HEAL_ALL),
            template("confirm_heal", CONFIRM_HEAL),
            template("alliance_button", ALLIANCE),
            template("help_all_button", HELP_ALL),
            template("map_button", MAP),
            template("search_button", SEARCH),
            template("upgrade_indicator", UPGRADE_IND),
            template("recommended_button", UPGRADE_IND + 100),
            template("upgrade_button", UPGRADE_BTN),
        ],
        200,
        100,
    )
}

#[derive(Default)]
struct DeviceLog {
    captures: usize,
    taps: Vec<Point>,
    swipes: usize,
}

/// Serves a fixed screen and records every input it receives
struct FakeDevice {
    screen: RgbaImage,
    log: Arc<Mutex<DeviceLog>>,
    /// 1-based capture index from which captures fail
    fail_capture_at: Option<usize>,
    /// Send a stop signal once this many captures have happened
    stop_after_captures: Option<(usize, ControlHandle)>,
    /// Send a pause signal at exactly this capture count
    pause_at_capture: Option<(usize, ControlHandle)>,
}

impl FakeDevice {
    fn new(screen: RgbaImage) -> (Self, Arc<Mutex<DeviceLog>>) {
        let log = Arc::new(Mutex::new(DeviceLog::default()));
        (
            Self {
                screen,
                log: Arc::clone(&log),
                fail_capture_at: None,
                stop_after_captures: None,
                pause_at_capture: None,
            },
            log,
        )
    }
}

impl DeviceControl for FakeDevice {
    fn capture_frame(&mut self) -> Result<Frame, DeviceError> {
        let captures = {
            let mut log = self.log.lock().unwrap();
            log.captures += 1;
            log.captures
        };
        if let Some(n) = self.fail_capture_at {
            if captures >= n {
                return Err(DeviceError::NotConnected);
            }
        }
        if let Some((n, handle)) = &self.stop_after_captures {
            if captures >= *n {
                handle.stop();
            }
        }
        if let Some((n, handle)) = &self.pause_at_capture {
            if captures == *n {
                handle.pause();
            }
        }
        Ok(Frame::new(self.screen.clone()))
    }

    fn tap(&mut self, point: Point, _duration: Duration) -> Result<(), DeviceError> {
        self.log.lock().unwrap().taps.push(point);
        Ok(())
    }

    fn swipe(&mut self, _path: &[Point], _total: Duration) -> Result<(), DeviceError> {
        self.log.lock().unwrap().swipes += 1;
        Ok(())
    }
}

/// Test sink that stays inspectable after the scheduler takes ownership
struct SharedSink(Arc<Mutex<MemorySink>>);

impl SharedSink {
    fn new() -> (Self, Arc<Mutex<MemorySink>>) {
        let inner = Arc::new(Mutex::new(MemorySink::default()));
        (Self(Arc::clone(&inner)), inner)
    }
}

impl StatsSink for SharedSink {
    fn record(&mut self, event: ActionEvent) {
        self.0.lock().unwrap().record(event);
    }

    fn alert(&mut self, message: &str) {
        self.0.lock().unwrap().alert(message);
    }
}

/// License valid for a fixed number of checks
struct CountedLicense(AtomicUsize);

impl LicenseGate for CountedLicense {
    fn is_valid(&self) -> bool {
        let left = self.0.load(Ordering::SeqCst);
        if left == 0 {
            return false;
        }
        self.0.store(left - 1, Ordering::SeqCst);
        true
    }

    fn remaining_time(&self) -> Duration {
        Duration::from_secs(3600)
    }
}

struct ForeverLicense;

impl LicenseGate for ForeverLicense {
    fn is_valid(&self) -> bool {
        true
    }

    fn remaining_time(&self) -> Duration {
        Duration::MAX
    }
}

fn descriptor(name: &'static str, priority: f64) -> TaskDescriptor {
    TaskDescriptor::new(name, priority, Duration::ZERO)
}

fn build_scheduler(
    registry: Vec<(Task, TaskDescriptor)>,
    device: FakeDevice,
    license: Box<dyn LicenseGate>,
    control: rok_warden::control::ControlReceiver,
    cfg: SchedulerConfig,
) -> (Scheduler, Arc<Mutex<MemorySink>>) {
    let (sink, events) = SharedSink::new();
    let scheduler = Scheduler::new(
        cfg,
        registry,
        store(),
        Humanizer::with_seed(HumanizerConfig::instant(), 7),
        Box::new(device),
        license,
        Box::new(sink),
        control,
        Some(7),
    );
    (scheduler, events)
}

#[test]
fn never_selects_an_ineligible_task() {
    // Hospital on screen, alliance button absent: only heal may run
    let (handle, receiver) = control::channel();
    let (mut device, log) = FakeDevice::new(screen(&[(HOSPITAL, 20, 20)]));
    device.stop_after_captures = Some((12, handle));

    let registry = vec![
        (Task::Heal(HealTask), descriptor("heal", 1.0)),
        (Task::Help(HelpTask::default()), descriptor("help", 5.0)),
    ];
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        Box::new(ForeverLicense),
        receiver,
        SchedulerConfig::instant(),
    );
    scheduler.run();

    let events = events.lock().unwrap();
    assert!(!events.events.is_empty());
    for event in &events.events {
        assert_eq!(event.task, "heal");
        // No wounded troops on the scripted screen
        assert_eq!(event.outcome, ActionOutcome::NotApplicable);
    }
    // Only the hospital was ever tapped
    let taps = &log.lock().unwrap().taps;
    assert!(!taps.is_empty());
}

#[test]
fn channel_failure_aborts_the_run() {
    let (_handle, receiver) = control::channel();
    let (mut device, log) = FakeDevice::new(screen(&[(HOSPITAL, 20, 20)]));
    // First cycle completes; the failure lands mid-task in the second
    device.fail_capture_at = Some(5);

    let registry = vec![(Task::Heal(HealTask), descriptor("heal", 1.0))];
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        Box::new(ForeverLicense),
        receiver,
        SchedulerConfig::instant(),
    );
    scheduler.run();

    let events = events.lock().unwrap();
    let last = events.events.last().unwrap();
    assert!(matches!(
        last.outcome,
        ActionOutcome::Aborted(AbortCause::Channel(_))
    ));
    assert_eq!(events.alerts.len(), 1);

    // The first cycle tapped the hospital once; nothing after the failure
    assert_eq!(log.lock().unwrap().taps.len(), 1);
}

#[test]
fn license_expiry_stops_within_one_cycle() {
    let (_handle, receiver) = control::channel();
    let (device, _log) = FakeDevice::new(screen(&[(HOSPITAL, 20, 20)]));

    let registry = vec![(Task::Heal(HealTask), descriptor("heal", 1.0))];
    let mut cfg = SchedulerConfig::instant();
    cfg.license_check_interval = 1;
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        // Valid for exactly one check
        Box::new(CountedLicense(AtomicUsize::new(1))),
        receiver,
        cfg,
    );
    scheduler.run();

    let events = events.lock().unwrap();
    // One task cycle ran, then the next license check ended the run
    let last = events.events.last().unwrap();
    assert_eq!(last.task, "license");
    assert_eq!(
        last.outcome,
        ActionOutcome::Aborted(AbortCause::LicenseInvalid)
    );
    let heal_events = events.events.iter().filter(|e| e.task == "heal").count();
    assert_eq!(heal_events, 1);
}

#[test]
fn upgrade_runs_when_a_building_is_flagged() {
    // Indicator and upgrade button both on screen: the upgrade goes through
    let (handle, receiver) = control::channel();
    let (mut device, log) = FakeDevice::new(screen(&[
        (UPGRADE_IND, 40, 60),
        (UPGRADE_BTN, 100, 60),
    ]));
    device.stop_after_captures = Some((6, handle));

    let registry = vec![(
        Task::Upgrade(UpgradeTask { speedup_chance: 0.0 }),
        descriptor("upgrade", 1.0),
    )];
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        Box::new(ForeverLicense),
        receiver,
        SchedulerConfig::instant(),
    );
    scheduler.run();

    let events = events.lock().unwrap();
    assert!(!events.events.is_empty());
    for event in &events.events {
        assert_eq!(event.task, "upgrade");
        assert_eq!(event.outcome, ActionOutcome::Success);
    }
    // Indicator tap plus upgrade button tap per attempt
    assert_eq!(log.lock().unwrap().taps.len(), events.events.len() * 2);
}

#[test]
fn upgrade_is_not_applicable_without_a_flag() {
    // Nothing upgradeable on screen
    let (handle, receiver) = control::channel();
    let (mut device, log) = FakeDevice::new(screen(&[(HOSPITAL, 20, 20)]));
    device.stop_after_captures = Some((6, handle));

    let registry = vec![(
        Task::Upgrade(UpgradeTask { speedup_chance: 0.0 }),
        descriptor("upgrade", 1.0),
    )];
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        Box::new(ForeverLicense),
        receiver,
        SchedulerConfig::instant(),
    );
    scheduler.run();

    let events = events.lock().unwrap();
    assert!(!events.events.is_empty());
    for event in &events.events {
        assert_eq!(event.task, "upgrade");
        assert_eq!(event.outcome, ActionOutcome::NotApplicable);
    }
    assert!(log.lock().unwrap().taps.is_empty());
}

#[test]
fn pause_suspends_cycles_until_resume() {
    let (handle, receiver) = control::channel();
    let (mut device, log) = FakeDevice::new(screen(&[(HOSPITAL, 20, 20)]));
    device.pause_at_capture = Some((6, handle.clone()));

    let registry = vec![(Task::Heal(HealTask), descriptor("heal", 1.0))];
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        Box::new(ForeverLicense),
        receiver,
        SchedulerConfig::instant(),
    );

    let watcher_log = Arc::clone(&log);
    let driver = std::thread::spawn(move || {
        // By now the pause signal has landed and the loop is idle
        std::thread::sleep(Duration::from_millis(250));
        let paused_before = watcher_log.lock().unwrap().captures;
        std::thread::sleep(Duration::from_millis(200));
        let paused_after = watcher_log.lock().unwrap().captures;

        handle.resume();
        std::thread::sleep(Duration::from_millis(250));
        let resumed = watcher_log.lock().unwrap().captures;
        handle.stop();
        (paused_before, paused_after, resumed)
    });

    scheduler.run();
    let (paused_before, paused_after, resumed) = driver.join().unwrap();

    // No captures happen while paused
    assert_eq!(paused_before, paused_after);
    // Cycles restart once resumed
    assert!(resumed > paused_after, "{resumed} vs {paused_after}");

    let events = events.lock().unwrap();
    assert!(!events.events.is_empty());
}

#[test]
fn failure_ceiling_pauses_exactly_once() {
    // Map button visible but the search screen never appears, so every
    // gather attempt times out and fails
    let (handle, receiver) = control::channel();
    let (device, log) = FakeDevice::new(screen(&[(MAP, 20, 20)]));

    let registry = vec![(
        Task::Gather(GatherTask::default()),
        descriptor("gather", 1.0),
    )];
    let mut cfg = SchedulerConfig::instant();
    cfg.failure_ceiling = 3;
    let (mut scheduler, events) = build_scheduler(
        registry,
        device,
        Box::new(ForeverLicense),
        receiver,
        cfg,
    );

    // The bot pauses itself; release the test by stopping it shortly after
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        handle.stop();
    });
    scheduler.run();
    stopper.join().unwrap();

    let events = events.lock().unwrap();
    let ceiling_alerts = events
        .alerts
        .iter()
        .filter(|a| a.contains("failure ceiling"))
        .count();
    assert_eq!(ceiling_alerts, 1);

    let failed = events
        .events
        .iter()
        .filter(|e| matches!(e.outcome, ActionOutcome::Failed(_)))
        .count();
    assert_eq!(failed, 3);

    // Each failed attempt tapped the map button before timing out
    assert_eq!(log.lock().unwrap().taps.len(), 3);
}
