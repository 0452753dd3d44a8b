//! 桌面操作边界：启动程序、打开网址、模拟按键、系统工具与状态读取。
//!
//! 打开器（xdg-open / open / cmd start）同步等待并检查退出码；
//! 直接启动的程序常驻后台，由 `Children` 在之后回收。

use crate::input_sim;
use starship_battery::units::ratio::percent;
use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

/// 系统工具类操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    LockScreen,
    ControlPanel,
    BluetoothSettings,
    PowerOptions,
    DeviceManager,
    SoundSettings,
    SystemSettings,
    ThisPc,
    TaskManager,
}

/// CPU 与电池读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemStatus {
    pub cpu_percent: f32,
    pub battery_percent: Option<u8>,
}

pub trait Desktop {
    fn launch(&mut self, path: &Path) -> Result<(), String>;
    fn open_url(&mut self, url: &str) -> Result<(), String>;
    /// 组合键，格式同 `input_sim::send_shortcut`
    fn send_keys(&mut self, shortcut: &str) -> Result<(), String>;
    /// 正数向下
    fn scroll(&mut self, lines: i32) -> Result<(), String>;
    fn type_text(&mut self, text: &str) -> Result<(), String>;
    fn run(&mut self, command: SystemCommand) -> Result<(), String>;
    fn status(&mut self) -> Result<SystemStatus, String>;
}

/// 真实桌面实现
pub struct SystemDesktop {
    use_clipboard: bool,
    children: Children,
    sampler: System,
}

impl SystemDesktop {
    pub fn new(use_clipboard: bool) -> Self {
        Self {
            use_clipboard,
            children: Children::default(),
            sampler: System::new(),
        }
    }

    /// 打开器类命令等待结束并检查退出码，其余程序常驻后台
    fn run_command(&mut self, argv: &[String]) -> Result<(), String> {
        let program = argv.first().map(String::as_str).unwrap_or_default();
        if LAUNCHERS.contains(&program) {
            run_to_completion(argv)
        } else {
            self.children.spawn(argv)
        }
    }

    fn launch_native(&mut self, path: &Path) -> Result<(), String> {
        if is_executable(path) {
            return self.children.spawn(&[path.display().to_string()]);
        }
        open_native(&path.display().to_string())
    }
}

impl Desktop for SystemDesktop {
    fn launch(&mut self, path: &Path) -> Result<(), String> {
        self.launch_native(path)
    }

    fn open_url(&mut self, url: &str) -> Result<(), String> {
        open_native(url)
    }

    fn send_keys(&mut self, shortcut: &str) -> Result<(), String> {
        input_sim::send_shortcut(shortcut)
    }

    fn scroll(&mut self, lines: i32) -> Result<(), String> {
        input_sim::scroll(lines)
    }

    fn type_text(&mut self, text: &str) -> Result<(), String> {
        input_sim::type_text(text, self.use_clipboard)
    }

    fn run(&mut self, command: SystemCommand) -> Result<(), String> {
        if command == SystemCommand::LockScreen {
            return lock_screen();
        }
        let argv = command_line(command)
            .ok_or_else(|| format!("当前平台不支持 {command:?}"))?;
        self.run_command(&argv)
    }

    fn status(&mut self) -> Result<SystemStatus, String> {
        // 两次刷新之间的占用才有意义
        self.sampler.refresh_cpu_usage();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        self.sampler.refresh_cpu_usage();
        Ok(SystemStatus {
            cpu_percent: self.sampler.global_cpu_usage().clamp(0.0, 100.0),
            battery_percent: read_battery_percent(),
        })
    }
}

/// 运行后立即返回的打开器
const LAUNCHERS: &[&str] = &["xdg-open", "open", "cmd", "loginctl", "pmset"];

/// 后台子进程；每次启动新进程前回收已退出的，避免留下僵尸进程
#[derive(Default)]
pub struct Children {
    running: Vec<Child>,
}

impl Children {
    pub fn spawn(&mut self, argv: &[String]) -> Result<(), String> {
        self.reap();
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| "空命令".to_string())?;
        let child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|e| format!("启动 {program} 失败: {e}"))?;
        log::debug!("已启动 {program} (pid {})", child.id());
        self.running.push(child);
        Ok(())
    }

    /// 回收已退出的子进程，返回仍在运行的数量
    pub fn reap(&mut self) -> usize {
        self.running.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("子进程 {} 已退出: {status}", child.id());
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("查询子进程 {} 状态失败: {e}", child.id());
                false
            }
        });
        self.running.len()
    }
}

/// 执行命令并等待结束，非零退出视为失败
pub fn run_to_completion(argv: &[String]) -> Result<(), String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "空命令".to_string())?;
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| format!("运行 {program} 失败: {e}"))?;
    ensure_success(status, program)
}

fn ensure_success(status: ExitStatus, program: &str) -> Result<(), String> {
    if status.success() {
        Ok(())
    } else {
        Err(format!("{program} 退出状态: {status}"))
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(target_os = "windows")]
fn command_line(command: SystemCommand) -> Option<Vec<String>> {
    let parts: &[&str] = match command {
        SystemCommand::LockScreen => return None,
        SystemCommand::ControlPanel => &["control"],
        SystemCommand::BluetoothSettings => &["cmd", "/C", "start", "", "ms-settings:bluetooth"],
        SystemCommand::PowerOptions => &["control", "powercfg.cpl"],
        SystemCommand::DeviceManager => &["mmc", "devmgmt.msc"],
        SystemCommand::SoundSettings => &["control", "mmsys.cpl", "sounds"],
        SystemCommand::SystemSettings => &["control", "sysdm.cpl"],
        SystemCommand::ThisPc => &["explorer", "shell:MyComputerFolder"],
        SystemCommand::TaskManager => &["taskmgr"],
    };
    Some(argv(parts))
}

#[cfg(target_os = "macos")]
fn command_line(command: SystemCommand) -> Option<Vec<String>> {
    let parts: &[&str] = match command {
        SystemCommand::ControlPanel | SystemCommand::SystemSettings => {
            &["open", "-b", "com.apple.systempreferences"]
        }
        SystemCommand::BluetoothSettings => {
            &["open", "x-apple.systempreferences:com.apple.preferences.Bluetooth"]
        }
        SystemCommand::PowerOptions => {
            &["open", "x-apple.systempreferences:com.apple.preference.battery"]
        }
        SystemCommand::SoundSettings => {
            &["open", "x-apple.systempreferences:com.apple.preference.sound"]
        }
        SystemCommand::ThisPc => &["open", "/"],
        SystemCommand::TaskManager => &["open", "-a", "Activity Monitor"],
        SystemCommand::LockScreen | SystemCommand::DeviceManager => return None,
    };
    Some(argv(parts))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn command_line(command: SystemCommand) -> Option<Vec<String>> {
    let parts: &[&str] = match command {
        SystemCommand::ControlPanel => &["gnome-control-center"],
        SystemCommand::BluetoothSettings => &["gnome-control-center", "bluetooth"],
        SystemCommand::PowerOptions => &["gnome-control-center", "power"],
        SystemCommand::SoundSettings => &["gnome-control-center", "sound"],
        SystemCommand::SystemSettings => &["gnome-control-center", "info-overview"],
        SystemCommand::TaskManager => &["gnome-system-monitor"],
        SystemCommand::ThisPc => {
            let home = dirs::home_dir()?;
            return Some(vec!["xdg-open".to_string(), home.display().to_string()]);
        }
        SystemCommand::LockScreen | SystemCommand::DeviceManager => return None,
    };
    Some(argv(parts))
}

#[cfg(target_os = "windows")]
fn lock_screen() -> Result<(), String> {
    use windows::Win32::System::Shutdown::LockWorkStation;
    unsafe { LockWorkStation() }.map_err(|e| format!("锁屏失败: {e}"))
}

#[cfg(target_os = "macos")]
fn lock_screen() -> Result<(), String> {
    run_to_completion(&argv(&["pmset", "displaysleepnow"]))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn lock_screen() -> Result<(), String> {
    run_to_completion(&argv(&["loginctl", "lock-session"]))
}

#[cfg(target_os = "windows")]
fn open_native(target: &str) -> Result<(), String> {
    run_to_completion(&argv(&["cmd", "/C", "start", "", target]))
}

#[cfg(target_os = "macos")]
fn open_native(target: &str) -> Result<(), String> {
    run_to_completion(&argv(&["open", target]))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn open_native(target: &str) -> Result<(), String> {
    run_to_completion(&argv(&["xdg-open", target]))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    // macOS 上 .app 包交给 open 处理
    !cfg!(target_os = "macos")
        && path
            .metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

/// 所有电池的平均电量；没有电池返回 None
fn read_battery_percent() -> Option<u8> {
    let manager = match starship_battery::Manager::new() {
        Ok(manager) => manager,
        Err(e) => {
            log::debug!("无法读取电池信息: {e}");
            return None;
        }
    };
    let charges: Vec<f32> = manager
        .batteries()
        .ok()?
        .filter_map(|battery| match battery {
            Ok(battery) => Some(battery.state_of_charge().get::<percent>()),
            Err(e) => {
                log::debug!("读取电池失败: {e}");
                None
            }
        })
        .collect();
    average_percent(&charges)
}

pub fn average_percent(charges: &[f32]) -> Option<u8> {
    if charges.is_empty() {
        return None;
    }
    let mean = charges.iter().sum::<f32>() / charges.len() as f32;
    Some(mean.round().clamp(0.0, 100.0) as u8)
}
