//! Set-wide pass: checks every reference against every landmark.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::join_all;
use quire_core::{Completer, File, Message, Place, PluginError};
use quire_tree::Position;
use tracing::debug;

use crate::collect::{Collected, DATA_KEY, Landmarks};
use crate::paths::{relative, resolve};
use crate::propose::{THRESHOLD, propose};
use crate::{PLUGIN_ID, SOURCE};

pub(crate) const RULE_MISSING_FILE: &str = "missing-file";
pub(crate) const RULE_MISSING_HEADING: &str = "missing-heading";
pub(crate) const RULE_MISSING_HEADING_IN_FILE: &str = "missing-heading-in-file";

/// The completer of the plugin.
pub(crate) struct Checker;

#[async_trait]
impl Completer for Checker {
    fn id(&self) -> Option<&str> {
        Some(PLUGIN_ID)
    }

    async fn complete(&self, files: &mut [File]) -> Result<Vec<File>, PluginError> {
        check_all(files).await;
        Ok(Vec::new())
    }
}

/// Links from one file to one location.
struct Linked {
    file: usize,
    positions: Vec<Option<Position>>,
}

/// Warns about every reference in `files` that points nowhere.
pub(crate) async fn check_all(files: &mut [File]) {
    let mut landmarks = Landmarks::new();
    for file in files.iter() {
        if let Some(collected) = file.data.get::<Collected>(DATA_KEY) {
            for (path, marks) in &collected.landmarks {
                landmarks.insert(path.clone(), marks.clone());
            }
        }
    }

    let mut references: BTreeMap<PathBuf, BTreeMap<String, Vec<Linked>>> = BTreeMap::new();
    for (index, file) in files.iter().enumerate() {
        let Some(collected) = file.data.get::<Collected>(DATA_KEY) else {
            continue;
        };
        for (path, hashes) in &collected.references {
            let by_hash = references.entry(path.clone()).or_default();
            for (hash, positions) in hashes {
                by_hash.entry(hash.clone()).or_default().push(Linked {
                    file: index,
                    positions: positions.clone(),
                });
            }
        }
    }

    check_files(&mut landmarks, references.keys()).await;

    let mut missing = Vec::new();
    for (path, by_hash) in references {
        let marks = landmarks.get(&path);
        for (hash, linked) in by_hash {
            let exists = marks
                .and_then(|marks| marks.get(&hash))
                .copied()
                .unwrap_or(false);
            if !exists {
                missing.extend(
                    linked
                        .into_iter()
                        .map(|linked| (path.clone(), hash.clone(), linked)),
                );
            }
        }
    }

    debug!("Found {} missing references", missing.len());
    for (path, hash, linked) in missing {
        warn(&mut files[linked.file], &landmarks, &path, &hash, &linked.positions);
    }
}

/// Marks whether each referenced path that is not a landmark yet exists.
async fn check_files<'a>(landmarks: &mut Landmarks, paths: impl Iterator<Item = &'a PathBuf>) {
    let unknown: Vec<&PathBuf> = paths.filter(|path| !landmarks.contains_key(*path)).collect();

    let checks = unknown.iter().map(|path| async move {
        match tokio::fs::metadata(path).await {
            Ok(_) => true,
            Err(e) => !matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory),
        }
    });
    let found = join_all(checks).await;

    for (path, exists) in unknown.into_iter().zip(found) {
        landmarks
            .entry(path.clone())
            .or_default()
            .insert(String::new(), exists);
    }
}

fn warn(
    file: &mut File,
    landmarks: &Landmarks,
    path: &Path,
    hash: &str,
    positions: &[Option<Position>],
) {
    let absolute = file.path().map(|own| resolve(&file.cwd, own));
    let base = absolute.as_deref().and_then(Path::parent);
    let shown = match base {
        Some(base) => relative(base, path),
        None => path.display().to_string(),
    };

    let (mut reason, rule) = if hash.is_empty() {
        (format!("Cannot find file `{shown}`"), RULE_MISSING_FILE)
    } else if base.is_some_and(|base| Some(resolve(base, &shown)) != absolute) {
        (
            format!("Cannot find heading for `#{hash}` in `{shown}`"),
            RULE_MISSING_HEADING_IN_FILE,
        )
    } else {
        (format!("Cannot find heading for `#{hash}`"), RULE_MISSING_HEADING)
    };

    let mut dictionary = Vec::new();
    for (landmark, marks) in landmarks {
        if marks.get("") != Some(&true) {
            continue;
        }
        let landmark = match base {
            Some(base) => relative(base, landmark),
            None => landmark.display().to_string(),
        };

        if hash.is_empty() {
            dictionary.push(landmark);
        } else if landmark == shown {
            dictionary.extend(marks.keys().filter(|mark| !mark.is_empty()).cloned());
        }
    }

    let value = if hash.is_empty() { shown.as_str() } else { hash };
    if let Some(suggestion) = propose(value, &dictionary, THRESHOLD) {
        reason.push_str(&format!("; did you mean `{suggestion}`"));
    }

    for position in positions {
        let mut message = Message::new(reason.clone()).with_origin(SOURCE, rule);
        if let Some(position) = position {
            message = message.with_place(Place::Position(*position));
        }
        file.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_tree::Point;

    fn position(line: usize) -> Option<Position> {
        Some(Position::new(Point::new(line, 1), Point::new(line, 5)))
    }

    fn file(path: &str, collected: Collected) -> File {
        let mut file = File::with_path("/repo", path);
        file.data.insert(DATA_KEY, collected);
        file
    }

    fn landmarks(path: &str, hashes: &[&str]) -> Landmarks {
        let marks = hashes.iter().map(|hash| (hash.to_string(), true)).collect();
        Landmarks::from([(PathBuf::from(path), marks)])
    }

    #[tokio::test]
    async fn test_merges_landmarks_of_all_files() {
        let mut a = Collected {
            landmarks: landmarks("/repo/a.md", &[""]),
            ..Default::default()
        };
        a.references
            .entry(PathBuf::from("/repo/b.md"))
            .or_default()
            .insert("intro".to_string(), vec![position(1)]);
        let b = Collected {
            landmarks: landmarks("/repo/b.md", &["", "intro"]),
            ..Default::default()
        };

        let mut files = vec![file("a.md", a), file("b.md", b)];
        check_all(&mut files).await;

        assert!(files.iter().all(|file| file.messages.is_empty()));
    }

    #[tokio::test]
    async fn test_one_message_per_link() {
        let mut a = Collected {
            landmarks: landmarks("/repo/a.md", &["", "intros"]),
            ..Default::default()
        };
        a.references
            .entry(PathBuf::from("/repo/a.md"))
            .or_default()
            .insert("intro".to_string(), vec![position(2), position(4)]);

        let mut files = vec![file("a.md", a)];
        check_all(&mut files).await;

        let messages = &files[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].reason,
            "Cannot find heading for `#intro`; did you mean `intros`"
        );
        assert_eq!(messages[0].rule_id.as_deref(), Some(RULE_MISSING_HEADING));
        assert_eq!(messages[1].place.unwrap().start().line, 4);
    }

    #[tokio::test]
    async fn test_heading_in_other_file() {
        let mut a = Collected {
            landmarks: landmarks("/repo/docs/a.md", &[""]),
            ..Default::default()
        };
        a.references
            .entry(PathBuf::from("/repo/b.md"))
            .or_default()
            .insert("usage".to_string(), vec![position(1)]);
        let b = Collected {
            landmarks: landmarks("/repo/b.md", &["", "install"]),
            ..Default::default()
        };

        let mut files = vec![file("docs/a.md", a), file("b.md", b)];
        check_all(&mut files).await;

        let message = &files[0].messages[0];
        assert_eq!(message.reason, "Cannot find heading for `#usage` in `../b.md`");
        assert_eq!(message.rule_id.as_deref(), Some(RULE_MISSING_HEADING_IN_FILE));
        assert_eq!(message.source.as_deref(), Some(SOURCE));
    }
}
