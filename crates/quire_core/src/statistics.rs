//! Message counts.

use std::ops::AddAssign;

use crate::file::File;
use crate::message::{Message, Severity};

/// Number of messages per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub fatal: usize,
    pub warn: usize,
    pub info: usize,
}

impl Statistics {
    /// Counts `messages`.
    pub fn of_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Self {
        let mut stats = Self::default();
        for message in messages {
            match message.severity {
                Severity::Error => stats.fatal += 1,
                Severity::Warning => stats.warn += 1,
                Severity::Info => stats.info += 1,
            }
        }
        stats
    }

    /// Counts the messages of every file.
    pub fn of_files<'a>(files: impl IntoIterator<Item = &'a File>) -> Self {
        let mut stats = Self::default();
        for file in files {
            stats += Self::of_messages(&file.messages);
        }
        stats
    }

    /// Warnings and infos.
    pub fn nonfatal(&self) -> usize {
        self.warn + self.info
    }

    pub fn total(&self) -> usize {
        self.fatal + self.warn + self.info
    }

    /// Returns true if the run should fail. With `frail`, warnings count.
    pub fn failed(&self, frail: bool) -> bool {
        if frail {
            self.fatal > 0 || self.warn > 0
        } else {
            self.fatal > 0
        }
    }
}

impl AddAssign for Statistics {
    fn add_assign(&mut self, other: Self) {
        self.fatal += other.fatal;
        self.warn += other.warn;
        self.info += other.info;
    }
}
