use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
	sync::Mutex,
};

use crate::{Error, Result, graph::GraphSnapshot};

/// Durable home of per-topic graphs. Topic keys arrive already normalized.
pub trait GraphStore
where
	Self: Send + Sync,
{
	/// Returns an empty snapshot for a topic that was never written.
	fn read(&self, topic: &str) -> Result<GraphSnapshot>;

	fn write(&self, topic: &str, snapshot: &GraphSnapshot) -> Result<()>;

	fn topics(&self) -> Result<Vec<String>>;
}

#[derive(Default)]
pub struct MemoryGraphStore {
	graphs: Mutex<HashMap<String, GraphSnapshot>>,
}
impl MemoryGraphStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl GraphStore for MemoryGraphStore {
	fn read(&self, topic: &str) -> Result<GraphSnapshot> {
		let graphs = self.graphs.lock().unwrap_or_else(|err| err.into_inner());

		Ok(graphs.get(topic).cloned().unwrap_or_else(|| GraphSnapshot::empty(topic)))
	}

	fn write(&self, topic: &str, snapshot: &GraphSnapshot) -> Result<()> {
		let mut graphs = self.graphs.lock().unwrap_or_else(|err| err.into_inner());

		graphs.insert(topic.to_string(), snapshot.clone());

		Ok(())
	}

	fn topics(&self) -> Result<Vec<String>> {
		let graphs = self.graphs.lock().unwrap_or_else(|err| err.into_inner());
		let mut topics: Vec<String> = graphs.keys().cloned().collect();

		topics.sort();

		Ok(topics)
	}
}

/// One pretty-printed JSON file per topic under a directory.
pub struct FileGraphStore {
	dir: PathBuf,
}
impl FileGraphStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn path_for(&self, topic: &str) -> PathBuf {
		self.dir.join(format!("{}.json", topic_slug(topic)))
	}
}

impl GraphStore for FileGraphStore {
	fn read(&self, topic: &str) -> Result<GraphSnapshot> {
		let path = self.path_for(topic);
		let raw = match fs::read(&path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound =>
				return Ok(GraphSnapshot::empty(topic)),
			Err(err) => return Err(Error::Io { path, source: err }),
		};

		Ok(serde_json::from_slice(&raw)?)
	}

	fn write(&self, topic: &str, snapshot: &GraphSnapshot) -> Result<()> {
		fs::create_dir_all(&self.dir)
			.map_err(|err| Error::Io { path: self.dir.clone(), source: err })?;

		let path = self.path_for(topic);
		let tmp = path.with_extension("json.tmp");
		let payload = serde_json::to_vec_pretty(snapshot)?;

		fs::write(&tmp, payload).map_err(|err| Error::Io { path: tmp.clone(), source: err })?;
		fs::rename(&tmp, &path).map_err(|err| Error::Io { path: path.clone(), source: err })?;

		tracing::debug!(topic, path = %path.display(), "Graph snapshot written.");

		Ok(())
	}

	fn topics(&self) -> Result<Vec<String>> {
		let entries = match fs::read_dir(&self.dir) {
			Ok(entries) => entries,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(Error::Io { path: self.dir.clone(), source: err }),
		};
		let mut topics = Vec::new();

		for entry in entries {
			let entry = entry.map_err(|err| Error::Io { path: self.dir.clone(), source: err })?;
			let path = entry.path();

			if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
				continue;
			}

			let raw = fs::read(&path).map_err(|err| Error::Io { path: path.clone(), source: err })?;

			match serde_json::from_slice::<GraphSnapshot>(&raw) {
				Ok(snapshot) => topics.push(snapshot.topic),
				Err(err) => {
					tracing::warn!(
						path = %path.display(),
						error = %err,
						"Skipping unreadable graph file."
					);
				},
			}
		}

		topics.sort();

		Ok(topics)
	}
}

fn topic_slug(topic: &str) -> String {
	let slug: String = topic
		.chars()
		.map(|ch| if ch.is_alphanumeric() { ch } else { '-' })
		.collect::<String>()
		.split('-')
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join("-");
	let hash = blake3::hash(topic.as_bytes()).to_hex();

	format!("{slug}-{}", &hash[..8])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slugs_are_filesystem_safe_and_distinct() {
		let slug = topic_slug("lung cancer/egfr");

		assert!(slug.starts_with("lung-cancer-egfr-"));
		assert_ne!(topic_slug("a b"), topic_slug("a-b"));
	}
}
