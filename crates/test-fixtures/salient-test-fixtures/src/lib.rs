use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, ensure, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    curves: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Dense samples of one or more animated channels over `[start, end]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampledCurve {
    #[serde(default)]
    pub description: String,
    pub start: i64,
    pub end: i64,
    #[serde(default = "one")]
    pub dims: usize,
    /// Frame-major: all channels of frame 0, then frame 1, ...
    pub samples: Vec<f64>,
}

fn one() -> usize {
    1
}

impl SampledCurve {
    pub fn frames(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

pub mod curves {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.curves.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.curves, "curve", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.curves, "curve", name)?;
        super::load_json(rel)
    }

    /// Typed load that also checks the sample count against the frame range.
    pub fn sampled(name: &str) -> Result<SampledCurve> {
        let curve: SampledCurve = load(name)?;
        ensure!(
            curve.end >= curve.start,
            "curve fixture '{name}' ends before it starts"
        );
        ensure!(
            curve.samples.len() == curve.frames() * curve.dims,
            "curve fixture '{name}' has {} samples for {} frames x {} channels",
            curve.samples.len(),
            curve.frames(),
            curve.dims
        );
        Ok(curve)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.curves, "curve", name)?;
        Ok(resolve_path(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_curve_loads() {
        for name in curves::keys() {
            let curve = curves::sampled(&name).unwrap();
            assert!(curve.frames() >= 3, "{name}");
            assert!(curves::path(&name).unwrap().exists());
        }
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(curves::json("missing").is_err());
    }
}
