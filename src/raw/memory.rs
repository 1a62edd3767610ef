use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::raw::{RawSource, RunArchive, to_points};

/// 内存中的数据集集合，用于合成数据与测试
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    name: String,
    series: HashMap<String, Arc<Vec<f32>>>,
    points: HashMap<String, Vec<[f32; 3]>>,
}

impl MemoryArchive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 长序列可在多个 archive 之间共享
    pub fn with_series(mut self, key: &str, values: Arc<Vec<f32>>) -> Self {
        self.series.insert(key.to_string(), values);
        self
    }

    pub fn with_points(mut self, key: &str, points: Vec<[f32; 3]>) -> Self {
        self.points.insert(key.to_string(), points);
        self
    }

    fn missing(&self, key: &str) -> Error {
        Error::MissingKey {
            path: PathBuf::from(&self.name),
            key: key.to_string(),
        }
    }
}

impl RunArchive for MemoryArchive {
    fn series(&mut self, key: &str) -> Result<Vec<f32>> {
        self.series
            .get(key)
            .map(|values| values.as_ref().clone())
            .ok_or_else(|| self.missing(key))
    }

    fn points(&mut self, key: &str) -> Result<Vec<[f32; 3]>> {
        let points = self.points.get(key).ok_or_else(|| self.missing(key))?;
        let flat: Vec<f32> = points.iter().flatten().copied().collect();
        to_points(key, &[points.len(), 3], flat)
    }
}

/// 以 (run, sim_id) 为键的内存原始数据源
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    stats: HashMap<(usize, usize), MemoryArchive>,
    shells: HashMap<(usize, usize), MemoryArchive>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_stats(&mut self, run: usize, sim_id: usize, archive: MemoryArchive) {
        self.stats.insert((run, sim_id), archive);
    }

    pub fn insert_shells(&mut self, run: usize, sim_id: usize, archive: MemoryArchive) {
        self.shells.insert((run, sim_id), archive);
    }

    fn lookup(
        map: &HashMap<(usize, usize), MemoryArchive>,
        kind: &str,
        run: usize,
        sim_id: usize,
    ) -> Result<MemoryArchive> {
        map.get(&(run, sim_id)).cloned().ok_or_else(|| Error::Io {
            path: PathBuf::from(format!("Run{}/{}-{}", run, kind, sim_id)),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

impl RawSource for MemorySource {
    type Archive = MemoryArchive;

    fn open_stats(&self, run: usize, sim_id: usize) -> Result<MemoryArchive> {
        Self::lookup(&self.stats, "DetailedOutput", run, sim_id)
    }

    fn open_shells(&self, run: usize, sim_id: usize) -> Result<MemoryArchive> {
        Self::lookup(&self.shells, "VTKFile", run, sim_id)
    }
}
