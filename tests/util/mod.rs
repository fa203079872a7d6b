use catalog_overlay::model::types::{EntrySettings, EntryValue, RawEntry, ResourceId, TypeTag};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Installs a thread-local subscriber at `debug` that writes into the
    /// buffer. Events stop being captured when the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }

    /// Captured lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.output().lines().filter(|l| l.contains(needle)).count()
    }

    /// Captured lines at `level` ("WARN", "DEBUG", ...).
    pub fn count_level(&self, level: &str) -> usize {
        self.output()
            .lines()
            .filter(|l| l.trim_start().starts_with(level))
            .count()
    }
}

struct TestWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

const NAMESPACES: &[&str] = &["minecraft", "create", "mekanism", "thermal"];
const MATERIALS: &[&str] = &[
    "iron", "gold", "copper", "brass", "diamond", "oak", "birch", "redstone",
];
const SHAPES: &[&str] = &["ingot", "nugget", "block", "plate", "stick", "planks", "dust"];

/// Named entry with the default namespace; the id path is derived from the
/// name (`"Diamond Stick"` → `minecraft:diamond_stick`).
#[allow(dead_code)]
pub fn named(name: &str) -> RawEntry {
    let path = name.to_lowercase().replace(' ', "_");
    RawEntry::item(EntryValue::new(ResourceId::new("minecraft", path)).with_display_name(name))
}

/// Deterministic catalog generator.
#[allow(dead_code)]
pub struct CatalogFixture {
    rng: ChaCha8Rng,
}

#[allow(dead_code)]
impl CatalogFixture {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// One random entry: material + shape item in a random namespace, with
    /// a tag per shape and occasional damage or components.
    pub fn entry(&mut self) -> RawEntry {
        let namespace = *NAMESPACES.choose(&mut self.rng).unwrap_or(&"minecraft");
        let material = *MATERIALS.choose(&mut self.rng).unwrap_or(&"iron");
        let shape = *SHAPES.choose(&mut self.rng).unwrap_or(&"ingot");
        let mut value = EntryValue::new(ResourceId::new(namespace, format!("{material}_{shape}")))
            .with_count(self.rng.gen_range(1..=64))
            .with_tags([format!("c:{shape}s")]);
        if self.rng.gen_bool(0.2) {
            value = value.with_damage(self.rng.gen_range(1..250));
        }
        if self.rng.gen_bool(0.1) {
            value = value.with_component("custom_name", json!({"text": format!("Lucky {material}")}));
        }
        let type_tag = if self.rng.gen_bool(0.05) {
            TypeTag::FLUID
        } else {
            TypeTag::ITEM
        };
        RawEntry {
            type_tag,
            value,
            settings: EntrySettings::default(),
        }
    }

    pub fn entries(&mut self, n: usize) -> Vec<RawEntry> {
        (0..n).map(|_| self.entry()).collect()
    }

    /// Like [`CatalogFixture::entry`], with `strict_components` set at random.
    pub fn entry_with_settings(&mut self) -> RawEntry {
        let mut raw = self.entry();
        raw.settings.strict_components = self.rng.gen_bool(0.3);
        raw
    }
}

/// Writes `entries` as a JSON catalog file inside `dir`.
#[allow(dead_code)]
pub fn write_catalog(dir: &Path, entries: &[RawEntry]) -> PathBuf {
    let path = dir.join("catalog.json");
    let json = serde_json::to_string_pretty(entries).expect("serialize catalog");
    std::fs::write(&path, json).expect("write catalog");
    path
}
