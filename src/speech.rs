use std::process::Command;

/// 播报边界，调用方不依赖播报是否成功
pub trait Output {
    fn say(&mut self, text: &str);
}

/// 打印到终端，可选调用外部 TTS 命令（文本作为最后一个参数）
pub struct Speaker {
    command: Vec<String>,
}

impl Speaker {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Output for Speaker {
    fn say(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        println!("{text}");

        let Some((program, args)) = self.command.split_first() else {
            return;
        };
        match Command::new(program).args(args).arg(text).status() {
            Ok(status) if !status.success() => {
                log::warn!("TTS 命令 {program} 退出状态: {status}");
            }
            Ok(_) => {}
            Err(e) => log::warn!("调用 TTS 命令 {program} 失败: {e}"),
        }
    }
}
