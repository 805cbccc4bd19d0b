use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::{AudioCommand, EngineFeedback};

mod engine;
mod kit;

use engine::Engine;

// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    feedback_rx: Receiver<EngineFeedback>,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.tx.try_send(cmd);
    }

    /// Latest engine snapshot, skipping any stale ones behind it.
    pub fn poll_feedback(&self) -> Option<EngineFeedback> {
        let mut latest = None;
        while let Ok(fb) = self.feedback_rx.try_recv() {
            latest = Some(fb);
        }
        latest
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (feedback_tx, feedback_rx) = crossbeam_channel::bounded::<EngineFeedback>(64);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(
                &device,
                &config.into(),
                rx,
                feedback_tx,
                sample_rate,
                channels,
            )?;
            output_stream
                .play()
                .context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                feedback_rx,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    feedback_tx: Sender<EngineFeedback>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(sample_rate, feedback_tx);

    let err_fn = |err| eprintln!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            let frames: &mut [StereoFrame] = unsafe {
                // casting raw interleaved floats to StereoFrames
                std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut StereoFrame, n_frames)
            };
            engine.render_block(frames);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
