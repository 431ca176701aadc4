// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Single-threaded event loop for a piano session.
//!
//! The loop owns the `SessionManager` and services two sources: commands
//! from the input layer, and the manager's next capture/playback deadline.
//! Waiting for a deadline is a `sleep_until` inside `select!`, so nothing
//! ever blocks the thread. The future is not `Send`; run it on a
//! current-thread runtime or a `LocalSet`.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use super::SessionManager;
use crate::audio::ToneSource;
use crate::location::Locator;
use crate::recording::{NoteSet, Recording};
use crate::sequencer::{NoteCallback, PlaybackReport};
use crate::store::{fetch_recordings, RecordStore};

/// Requests sent to the event loop
#[derive(Debug)]
pub enum Command {
    /// Key down
    Press(String),
    /// Key up
    Release(String),
    /// Open a recording session
    BeginRecording(oneshot::Sender<bool>),
    /// Close the recording session and save the result
    EndRecording(oneshot::Sender<Option<Recording>>),
    /// Save again the recording whose save failed
    RetryUnsaved(oneshot::Sender<Option<Recording>>),
    /// Hand over the recording whose save failed
    TakeUnsaved(oneshot::Sender<Option<Recording>>),
    /// Drop the recording whose save failed
    DiscardUnsaved(oneshot::Sender<bool>),
    /// Replay a recording
    Play(Box<Recording>, oneshot::Sender<bool>),
    /// Abandon the playback in progress
    CancelPlayback,
    /// All stored recordings, most recent first
    ListRecordings(oneshot::Sender<Vec<Recording>>),
    /// Stop the loop
    Shutdown,
}

/// Events emitted by the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Notes sounding at a playback step
    ActiveNotes(NoteSet),
    /// A playback completed or was cancelled
    PlaybackFinished(PlaybackReport),
    /// A recording reached the store
    RecordingSaved(Recording),
    /// A recording could not be saved and is held as unsaved
    SaveFailed(Recording),
}

/// Cloneable handle for sending commands to the event loop
#[derive(Debug, Clone)]
pub struct PianoHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl PianoHandle {
    /// Create a handle and the receiving end for `EventLoop::run`
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (commands, rx) = mpsc::unbounded_channel();
        (Self { commands }, rx)
    }

    fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Key down
    pub fn press(&self, binding: impl Into<String>) -> bool {
        self.send(Command::Press(binding.into()))
    }

    /// Key up
    pub fn release(&self, binding: impl Into<String>) -> bool {
        self.send(Command::Release(binding.into()))
    }

    /// Open a recording session; false if one was already open
    pub async fn begin_recording(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        self.send(Command::BeginRecording(tx)) && rx.await.unwrap_or(false)
    }

    /// Close the recording session and save it
    pub async fn end_recording(&self) -> Option<Recording> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::EndRecording(tx)) {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Save again the recording whose save failed
    pub async fn retry_unsaved(&self) -> Option<Recording> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::RetryUnsaved(tx)) {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Take the recording whose save failed out of the session
    pub async fn take_unsaved(&self) -> Option<Recording> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::TakeUnsaved(tx)) {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Drop the recording whose save failed; false if there was none
    pub async fn discard_unsaved(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        self.send(Command::DiscardUnsaved(tx)) && rx.await.unwrap_or(false)
    }

    /// Replay a recording; false if the request was dropped
    pub async fn play(&self, recording: Recording) -> bool {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Play(Box::new(recording), tx)) && rx.await.unwrap_or(false)
    }

    /// Abandon the playback in progress
    pub fn cancel_playback(&self) -> bool {
        self.send(Command::CancelPlayback)
    }

    /// All stored recordings, most recent first
    pub async fn list_recordings(&self) -> Vec<Recording> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::ListRecordings(tx)) {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Stop the loop
    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }
}

/// Event loop driving a `SessionManager`
pub struct EventLoop<T: ToneSource> {
    manager: SessionManager<T>,
    store: Box<dyn RecordStore>,
    locator: Box<dyn Locator>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<T: ToneSource> EventLoop<T> {
    /// Create a loop and the receiver for its notifications
    pub fn new(
        manager: SessionManager<T>,
        store: Box<dyn RecordStore>,
        locator: Box<dyn Locator>,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, rx) = mpsc::unbounded_channel();
        (
            Self {
                manager,
                store,
                locator,
                notifications,
            },
            rx,
        )
    }

    /// Run until `Shutdown` or until every handle is dropped.
    ///
    /// On exit any playback is cancelled and held keys are released.
    /// Returns the manager for inspection.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) -> SessionManager<T> {
        info!("event loop started");

        loop {
            let deadline = self.manager.next_deadline();
            tokio::select! {
                biased;
                _ = wait_for(deadline) => self.service(),
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
            }
        }

        if let Some(report) = self.manager.cancel_playback() {
            self.notify(Notification::PlaybackFinished(report));
        }
        self.manager.release_all();
        info!("event loop stopped");
        self.manager
    }

    fn service(&mut self) {
        if let Some(report) = self.manager.pump(Instant::now()) {
            self.notify(Notification::PlaybackFinished(report));
        }
    }

    fn handle(&mut self, command: Command) {
        debug!(?command, "command");
        match command {
            Command::Press(binding) => {
                self.manager.press_key(&binding);
            }
            Command::Release(binding) => {
                self.manager.release_key(&binding);
            }
            Command::BeginRecording(reply) => {
                let _ = reply.send(self.manager.begin_recording());
            }
            Command::EndRecording(reply) => {
                let saved = match self.manager.end_recording() {
                    Some(recording) => self.save(recording),
                    None => None,
                };
                let _ = reply.send(saved);
            }
            Command::RetryUnsaved(reply) => {
                let saved = match self.manager.take_unsaved() {
                    Some(recording) => self.save(recording),
                    None => None,
                };
                let _ = reply.send(saved);
            }
            Command::TakeUnsaved(reply) => {
                let _ = reply.send(self.manager.take_unsaved());
            }
            Command::DiscardUnsaved(reply) => {
                let _ = reply.send(self.manager.discard_unsaved());
            }
            Command::Play(recording, reply) => {
                let on_change = self.note_callback();
                let accepted = self.manager.begin_playback(&recording, on_change);
                let _ = reply.send(accepted);
            }
            Command::CancelPlayback => {
                if let Some(report) = self.manager.cancel_playback() {
                    self.notify(Notification::PlaybackFinished(report));
                }
            }
            Command::ListRecordings(reply) => {
                let _ = reply.send(fetch_recordings(self.store.as_ref()));
            }
            Command::Shutdown => {}
        }
    }

    fn save(&mut self, recording: Recording) -> Option<Recording> {
        let saved =
            self.manager
                .save_recording(recording, self.store.as_mut(), self.locator.as_ref());
        match &saved {
            Some(recording) => self.notify(Notification::RecordingSaved(recording.clone())),
            None => {
                if let Some(unsaved) = self.manager.unsaved() {
                    self.notify(Notification::SaveFailed(unsaved.clone()));
                }
            }
        }
        saved
    }

    fn note_callback(&self) -> NoteCallback {
        let notifications = self.notifications.clone();
        Box::new(move |notes: &NoteSet| {
            let _ = notifications.send(Notification::ActiveNotes(notes.clone()));
        })
    }

    fn notify(&self, notification: Notification) {
        // Nobody listening is fine
        let _ = self.notifications.send(notification);
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
