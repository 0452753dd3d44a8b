use crate::asr::AsrClient;
use crate::capture::{Capture, CaptureError};
use crate::config::CaptureConfig;
use crate::vad::{VadParams, VoiceActivityDetector};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// 轮询音频帧的间隔
const FRAME_WAIT: Duration = Duration::from_millis(100);

/// 麦克风采集：VAD 切出一句话，编码 WAV 后交给 ASR 服务
pub struct MicrophoneCapture {
    asr: AsrClient,
    runtime: Runtime,
    settings: CaptureConfig,
}

impl MicrophoneCapture {
    /// 没有麦克风时直接失败，不进入会话
    pub fn new(asr: AsrClient, settings: CaptureConfig) -> Result<Self, String> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or("未找到麦克风设备")?;
        match device.name() {
            Ok(name) => log::info!("使用麦克风: {name}"),
            Err(e) => log::warn!("读取麦克风名称失败: {e}"),
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("创建运行时失败: {e}"))?;
        Ok(Self {
            asr,
            runtime,
            settings,
        })
    }

    /// 录一句话；超时未开口返回 None
    fn record_phrase(
        &self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<(Vec<f32>, u32)>, String> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or("未找到麦克风设备")?;

        let supported = device
            .default_input_config()
            .map_err(|e| format!("获取麦克风配置失败: {e}"))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // 音频回调运行在驱动线程，帧通过通道交回当前线程
        let (frame_tx, frame_rx) = mpsc::channel::<Vec<f32>>();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = frame_tx.send(downmix(data, channels));
                },
                |err| log::error!("音频流错误: {err}"),
                None,
            )
            .map_err(|e| format!("创建音频流失败: {e}"))?;
        stream.play().map_err(|e| format!("启动音频流失败: {e}"))?;
        log::debug!("开始监听");

        let mut vad = VoiceActivityDetector::new(
            sample_rate,
            VadParams {
                speech_threshold: self.settings.speech_threshold,
                silence_timeout_ms: self.settings.silence_timeout_ms,
                min_speech_duration_ms: self.settings.min_speech_duration_ms,
                phrase_limit_ms: phrase_limit.as_millis() as u64,
            },
        );
        let started = Instant::now();

        loop {
            if !vad.is_speaking() && started.elapsed() >= timeout {
                log::debug!("等待语音超时");
                return Ok(None);
            }
            match frame_rx.recv_timeout(FRAME_WAIT) {
                Ok(frame) => {
                    if let Some(segment) = vad.process_frame(&frame) {
                        return Ok(Some((segment, sample_rate)));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err("音频流已断开".to_string()),
            }
        }
    }
}

impl Capture for MicrophoneCapture {
    fn capture(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<String>, CaptureError> {
        println!("Listening...");
        let Some((samples, sample_rate)) = self
            .record_phrase(timeout, phrase_limit)
            .map_err(CaptureError::Service)?
        else {
            return Ok(None);
        };

        let wav = encode_wav(&samples, sample_rate).map_err(CaptureError::Service)?;
        println!("Recognizing...");
        let text = self
            .runtime
            .block_on(self.asr.recognize(wav))
            .map_err(CaptureError::Service)?;

        if text.is_empty() {
            return Ok(None);
        }
        log::info!("识别结果: {text}");
        println!("You said: {text}");
        Ok(Some(text))
    }
}

/// 多声道转单声道
pub fn downmix(data: &[f32], channels: u16) -> Vec<f32> {
    if channels > 1 {
        data.chunks(channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        data.to_vec()
    }
}

/// 将 PCM f32 数据编码为 16 位单声道 WAV bytes
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, String> {
    if samples.is_empty() {
        return Err("录音数据为空".to_string());
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).map_err(|e| format!("创建 WAV 写入器失败: {e}"))?;
        for &sample in samples {
            // f32 [-1.0, 1.0] → i16
            let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(s)
                .map_err(|e| format!("写入 WAV 样本失败: {e}"))?;
        }
        writer
            .finalize()
            .map_err(|e| format!("完成 WAV 编码失败: {e}"))?;
    }

    Ok(cursor.into_inner())
}
