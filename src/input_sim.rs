use enigo::{Axis, Direction, Enigo, Key, Keyboard, Mouse, Settings};

fn new_enigo() -> Result<Enigo, String> {
    Enigo::new(&Settings::default()).map_err(|e| format!("初始化 enigo 失败: {e}"))
}

/// 模拟键盘输入文本
pub fn type_text(text: &str, use_clipboard: bool) -> Result<(), String> {
    if use_clipboard {
        type_via_clipboard(text)
    } else {
        new_enigo()?
            .text(text)
            .map_err(|e| format!("输入文本失败: {e}"))
    }
}

/// 通过剪贴板 + 粘贴快捷键输入
fn type_via_clipboard(text: &str) -> Result<(), String> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| format!("打开剪贴板失败: {e}"))?;
    clipboard
        .set_text(text)
        .map_err(|e| format!("写入剪贴板失败: {e}"))?;

    // 短暂延迟确保剪贴板就绪
    std::thread::sleep(std::time::Duration::from_millis(50));

    if cfg!(target_os = "macos") {
        send_shortcut("META+V")
    } else {
        send_shortcut("CTRL+V")
    }
}

/// 模拟组合键，如 "ALT+TAB"、"CTRL+SHIFT+S"、"VOLUMEUP"
pub fn send_shortcut(shortcut: &str) -> Result<(), String> {
    let keys = parse_shortcut(shortcut)?;
    let mut enigo = new_enigo()?;

    for key in &keys {
        enigo
            .key(*key, Direction::Press)
            .map_err(|e| format!("按下 {shortcut} 失败: {e}"))?;
    }
    for key in keys.iter().rev() {
        enigo
            .key(*key, Direction::Release)
            .map_err(|e| format!("释放 {shortcut} 失败: {e}"))?;
    }
    Ok(())
}

/// 垂直滚动，正数向下
pub fn scroll(lines: i32) -> Result<(), String> {
    new_enigo()?
        .scroll(lines, Axis::Vertical)
        .map_err(|e| format!("滚动失败: {e}"))
}

/// 解析快捷键字符串为 enigo Key 列表
pub fn parse_shortcut(shortcut: &str) -> Result<Vec<Key>, String> {
    let keys = shortcut
        .split('+')
        .map(|part| parse_key(part.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(format!("空快捷键: {shortcut:?}"));
    }
    Ok(keys)
}

/// 解析单个按键名称；"+" 与 "-" 分别写作 PLUS、MINUS
fn parse_key(name: &str) -> Result<Key, String> {
    match name.to_uppercase().as_str() {
        "CTRL" | "CONTROL" => Ok(Key::Control),
        "ALT" | "OPTION" => Ok(Key::Alt),
        "SHIFT" => Ok(Key::Shift),
        "META" | "WIN" | "SUPER" | "CMD" => Ok(Key::Meta),
        "TAB" => Ok(Key::Tab),
        "ENTER" | "RETURN" => Ok(Key::Return),
        "ESCAPE" | "ESC" => Ok(Key::Escape),
        "SPACE" => Ok(Key::Space),
        "BACKSPACE" => Ok(Key::Backspace),
        "DELETE" | "DEL" => Ok(Key::Delete),
        "UP" => Ok(Key::UpArrow),
        "DOWN" => Ok(Key::DownArrow),
        "LEFT" => Ok(Key::LeftArrow),
        "RIGHT" => Ok(Key::RightArrow),
        "HOME" => Ok(Key::Home),
        "END" => Ok(Key::End),
        "PAGEUP" => Ok(Key::PageUp),
        "PAGEDOWN" => Ok(Key::PageDown),
        "PLUS" => Ok(Key::Unicode('+')),
        "MINUS" => Ok(Key::Unicode('-')),
        "VOLUMEUP" => Ok(Key::VolumeUp),
        "VOLUMEDOWN" => Ok(Key::VolumeDown),
        "VOLUMEMUTE" | "MUTE" => Ok(Key::VolumeMute),
        "PRINTSCREEN" => print_screen_key(),
        "F1" => Ok(Key::F1),
        "F2" => Ok(Key::F2),
        "F3" => Ok(Key::F3),
        "F4" => Ok(Key::F4),
        "F5" => Ok(Key::F5),
        "F6" => Ok(Key::F6),
        "F7" => Ok(Key::F7),
        "F8" => Ok(Key::F8),
        "F9" => Ok(Key::F9),
        "F10" => Ok(Key::F10),
        "F11" => Ok(Key::F11),
        "F12" => Ok(Key::F12),
        s if s.chars().count() == 1 => {
            let c = s.chars().next().map(|c| c.to_ascii_lowercase());
            c.map(Key::Unicode).ok_or_else(|| format!("未知按键: {name}"))
        }
        _ => Err(format!("未知按键: {name}")),
    }
}

#[cfg(target_os = "windows")]
fn print_screen_key() -> Result<Key, String> {
    // VK_SNAPSHOT
    Ok(Key::Other(0x2C))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn print_screen_key() -> Result<Key, String> {
    // XK_Print
    Ok(Key::Other(0xff61))
}

#[cfg(not(any(target_os = "windows", all(unix, not(target_os = "macos")))))]
fn print_screen_key() -> Result<Key, String> {
    Err("当前平台没有 PrintScreen 键".to_string())
}
