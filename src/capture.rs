use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// 识别后端或录音设备不可用
    #[error("语音识别服务异常: {0}")]
    Service(String),
    /// 输入源已关闭（如 stdin 结束）
    #[error("输入已结束")]
    Closed,
}

/// 采集一句话并转成文本
///
/// `Ok(None)` 表示超时或听不清，调用方直接重新监听。
pub trait Capture {
    fn capture(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<String>, CaptureError>;
}

/// 键盘输入模式：从 stdin 逐行读取
pub struct ConsoleCapture {
    lines: Receiver<String>,
}

impl ConsoleCapture {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<String>();
        // stdin 读取是阻塞的，放到独立线程里，超时由 recv_timeout 控制
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("读取标准输入失败: {e}");
                        break;
                    }
                }
            }
            log::info!("标准输入已关闭");
        });
        Self { lines: rx }
    }
}

impl Capture for ConsoleCapture {
    fn capture(
        &mut self,
        timeout: Duration,
        _phrase_limit: Duration,
    ) -> Result<Option<String>, CaptureError> {
        print!("> ");
        let _ = io::stdout().flush();
        match self.lines.recv_timeout(timeout) {
            Ok(line) => {
                let line = line.trim().to_string();
                Ok((!line.is_empty()).then_some(line))
            }
            Err(RecvTimeoutError::Timeout) => {
                println!();
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Closed),
        }
    }
}
