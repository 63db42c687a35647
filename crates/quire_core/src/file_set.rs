//! The set of files processed in one run, and the barrier they meet at.
//!
//! Files are owned by the task processing them. When a file reaches the
//! barrier it is handed over to the set and parked. Once no tracked file is
//! still on its way, the parked files form a wave: completers run over the
//! whole wave, then every file is handed back to its task.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::file::File;
use crate::plugin::Completer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Being processed, the barrier waits for it.
    Running,
    /// Fatal or ignored before it started, the barrier does not wait for it.
    Inert,
    /// Waiting at the barrier.
    Parked,
    /// Past the barrier.
    Released,
}

struct Released {
    file: File,
    error: Option<String>,
}

#[derive(Default)]
struct State {
    expected: usize,
    actual: usize,
    origins: HashSet<String>,
    slots: HashMap<String, Slot>,
    parked: Vec<(File, oneshot::Sender<Released>)>,
    completers: Vec<Arc<dyn Completer>>,
    completer_ids: HashSet<String>,
    flushing: bool,
}

impl State {
    fn can_flush(&self) -> bool {
        !self.parked.is_empty() && !self.slots.values().any(|slot| *slot == Slot::Running)
    }
}

struct Inner {
    state: Mutex<State>,
    added: mpsc::UnboundedSender<File>,
}

/// Handle to the files of one run. Cheap to clone.
#[derive(Clone)]
pub struct FileSet {
    inner: Arc<Inner>,
}

impl FileSet {
    /// Creates an empty set.
    ///
    /// Every file accepted by [`FileSet::add`] is sent to the returned
    /// receiver, which the driver turns into a file pipeline task.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<File>) {
        let (added, receiver) = mpsc::unbounded_channel();
        let set = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                added,
            }),
        };
        (set, receiver)
    }

    /// Adds a file to the set.
    ///
    /// Returns false, and drops the file, when a file with the same origin
    /// was added before.
    pub fn add(&self, file: File) -> bool {
        let origin = file.origin();
        {
            let mut state = self.inner.state.lock();
            if !state.origins.insert(origin.clone()) {
                debug!("Not adding `{}` again", origin);
                return false;
            }

            state.expected += 1;
            let slot = if file.has_fatal() || file.ignored {
                Slot::Inert
            } else {
                Slot::Running
            };
            state.slots.insert(origin.clone(), slot);
        }

        debug!("Adding `{}`", origin);
        if self.inner.added.send(file).is_err() {
            debug!("File set receiver is gone, `{}` will not be processed", origin);
        }
        true
    }

    /// Registers a completer to run at the barrier.
    ///
    /// A completer is registered once: by id when it has one, otherwise by
    /// identity.
    pub fn use_completer(&self, completer: Arc<dyn Completer>) {
        let mut state = self.inner.state.lock();

        let duplicate = match completer.id() {
            Some(id) => state.completer_ids.contains(id),
            None => false,
        } || state
            .completers
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &completer));

        if duplicate {
            return;
        }

        if let Some(id) = completer.id() {
            state.completer_ids.insert(id.to_string());
        }
        state.completers.push(completer);
    }

    /// Origins of every file added so far, sorted.
    pub fn origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self.inner.state.lock().origins.iter().cloned().collect();
        origins.sort();
        origins
    }

    /// Number of files added so far.
    pub fn expected(&self) -> usize {
        self.inner.state.lock().expected
    }

    /// Number of files that finished their pipeline.
    pub fn actual(&self) -> usize {
        self.inner.state.lock().actual
    }

    /// Records that one file finished its pipeline.
    ///
    /// Returns true once every added file has finished.
    pub fn one(&self) -> bool {
        let mut state = self.inner.state.lock();
        state.actual += 1;
        state.actual >= state.expected
    }

    /// Returns true once every added file has finished.
    pub fn is_done(&self) -> bool {
        let state = self.inner.state.lock();
        state.actual >= state.expected
    }

    /// Waits at the barrier.
    ///
    /// Resolves with the file once its wave was flushed, together with the
    /// error of a failing completer, if any.
    pub async fn arrive(&self, file: File) -> (File, Option<String>) {
        let origin = file.origin();
        let cwd = file.cwd.clone();
        let (sender, receiver) = oneshot::channel();

        let flush = {
            let mut state = self.inner.state.lock();
            debug!("Queueing `{}`", origin);
            state.slots.insert(origin.clone(), Slot::Parked);
            state.parked.push((file, sender));

            if state.flushing || !state.can_flush() {
                debug!("Not flushing: some files cannot be flushed");
                false
            } else {
                state.flushing = true;
                true
            }
        };

        if flush {
            self.flush().await;
        }

        match receiver.await {
            Ok(released) => (released.file, released.error),
            Err(_) => {
                let mut file = if origin.is_empty() {
                    File::new(cwd)
                } else {
                    File::with_path(cwd, origin)
                };
                file.fail("Cannot process file: the file set was dropped");
                (file, None)
            }
        }
    }

    async fn flush(&self) {
        loop {
            let (batch, completers) = {
                let mut state = self.inner.state.lock();
                let batch = std::mem::take(&mut state.parked);
                for (file, _) in &batch {
                    state.slots.insert(file.origin(), Slot::Released);
                }
                (batch, state.completers.clone())
            };

            debug!("Flushing: all {} files can be flushed", batch.len());
            let (mut files, senders): (Vec<File>, Vec<_>) = batch.into_iter().unzip();

            let mut error = None;
            for completer in &completers {
                match completer.complete(&mut files).await {
                    Ok(added) => {
                        for file in added {
                            self.add(file);
                        }
                    }
                    Err(e) => {
                        error = Some(e.to_string());
                        break;
                    }
                }
            }

            for (file, sender) in files.into_iter().zip(senders) {
                let released = Released {
                    file,
                    error: error.clone(),
                };
                if sender.send(released).is_err() {
                    debug!("A file left the barrier before it was flushed");
                }
            }

            let mut state = self.inner.state.lock();
            if !state.can_flush() {
                state.flushing = false;
                break;
            }
        }
    }
}
