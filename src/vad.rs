/// VAD 状态机状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadState {
    /// 空闲，等待语音
    Idle,
    /// 检测到语音，正在录音
    Speaking,
    /// 语音段已交出，等待 reset
    Processing,
}

/// VAD 参数
#[derive(Debug, Clone, Copy)]
pub struct VadParams {
    /// RMS 能量阈值
    pub speech_threshold: f32,
    /// 静音超时（毫秒）
    pub silence_timeout_ms: u64,
    /// 最短语音段（毫秒）
    pub min_speech_duration_ms: u64,
    /// 单句最长时长（毫秒），到达后强制截断
    pub phrase_limit_ms: u64,
}

/// 语音活动检测器
///
/// 时长按已处理的样本数计算，与调用节奏无关。
pub struct VoiceActivityDetector {
    pub state: VadState,
    params: VadParams,
    sample_rate: u32,
    /// 语音段累计样本数
    speech_samples: u64,
    /// 最近一次检测到语音后累计的静音样本数
    silence_samples: u64,
    pub buffer: Vec<f32>,
}

impl VoiceActivityDetector {
    pub fn new(sample_rate: u32, params: VadParams) -> Self {
        Self {
            state: VadState::Idle,
            params,
            sample_rate: sample_rate.max(1),
            speech_samples: 0,
            silence_samples: 0,
            buffer: Vec::new(),
        }
    }

    /// 计算音频帧的 RMS 能量
    fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        (sum / samples.len() as f32).sqrt()
    }

    fn to_ms(&self, samples: u64) -> u64 {
        samples * 1000 / self.sample_rate as u64
    }

    pub fn is_speaking(&self) -> bool {
        self.state == VadState::Speaking
    }

    /// 处理一帧单声道数据；返回 Some(data) 表示一句话结束，应送去识别
    pub fn process_frame(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let is_speech = Self::rms(samples) > self.params.speech_threshold;
        let frame_len = samples.len() as u64;

        match self.state {
            VadState::Idle => {
                if is_speech {
                    self.state = VadState::Speaking;
                    self.speech_samples = frame_len;
                    self.silence_samples = 0;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    log::debug!("VAD: 检测到语音开始");
                }
                None
            }
            VadState::Speaking => {
                self.buffer.extend_from_slice(samples);
                self.speech_samples += frame_len;
                if is_speech {
                    self.silence_samples = 0;
                } else {
                    self.silence_samples += frame_len;
                }

                let speech_ms = self.to_ms(self.speech_samples);
                if speech_ms >= self.params.phrase_limit_ms {
                    log::debug!("VAD: 达到单句上限 {speech_ms}ms，截断");
                    return Some(self.finish());
                }

                if self.to_ms(self.silence_samples) >= self.params.silence_timeout_ms {
                    // 不计尾部静音
                    let voiced_ms = self.to_ms(self.speech_samples - self.silence_samples);
                    if voiced_ms >= self.params.min_speech_duration_ms {
                        log::debug!("VAD: 语音段结束，有效时长 {voiced_ms}ms");
                        return Some(self.finish());
                    }
                    log::debug!("VAD: 语音段过短，丢弃");
                    self.reset();
                }
                None
            }
            VadState::Processing => None,
        }
    }

    fn finish(&mut self) -> Vec<f32> {
        self.state = VadState::Processing;
        std::mem::take(&mut self.buffer)
    }

    /// 重置为空闲状态
    pub fn reset(&mut self) {
        self.state = VadState::Idle;
        self.speech_samples = 0;
        self.silence_samples = 0;
        self.buffer.clear();
    }
}
