//! Audible alarm output, compiled with the `audio` feature.

pub mod tone;

use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use anyhow::{anyhow, Result};
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::notify::{Notification, Notifier};
use tone::AlarmTone;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

enum AlarmCommand {
    Ring(Vec<u64>),
}

/// Owns the output device on a dedicated thread; rodio handles are not `Send`.
#[derive(Clone, Default)]
pub struct AlarmPlayer {
    tx: Arc<Mutex<Option<Sender<AlarmCommand>>>>,
}

impl AlarmPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_thread(&self) -> Result<Sender<AlarmCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("alarm player lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AlarmCommand>();
        thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AlarmCommand::Ring(pattern) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            if output.is_none() {
                                match OutputStream::try_default() {
                                    Ok(pair) => output = Some(pair),
                                    Err(err) => {
                                        log_warn!("failed to open audio output: {err}");
                                        continue;
                                    }
                                }
                            }
                            let Some((_, handle)) = output.as_ref() else {
                                continue;
                            };
                            match Sink::try_new(handle) {
                                Ok(new_sink) => {
                                    new_sink.append(AlarmTone::new(&pattern));
                                    sink = Some(new_sink);
                                }
                                Err(err) => log_warn!("failed to create audio sink: {err}"),
                            }
                        }
                    }
                }
            })?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    /// Play the tone for `pattern`, cutting off any alarm still ringing.
    pub fn ring(&self, pattern: &[u64]) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AlarmCommand::Ring(pattern.to_vec()))
            .map_err(|_| anyhow!("alarm thread exited"))
    }
}

/// Adds a real alarm tone in front of another notifier.
pub struct AlarmNotifier {
    player: AlarmPlayer,
    inner: Arc<dyn Notifier>,
}

impl AlarmNotifier {
    pub fn new(inner: Arc<dyn Notifier>) -> Self {
        Self {
            player: AlarmPlayer::new(),
            inner,
        }
    }
}

impl Notifier for AlarmNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        self.inner.show(notification)
    }

    fn alarm(&self, vibration: &[u64]) -> Result<()> {
        let rang = self.player.ring(vibration);
        self.inner.alarm(vibration)?;
        rang
    }
}
