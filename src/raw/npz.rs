use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use npyz::npz::NpzArchive;
use tracing::debug;

use crate::error::{Error, Result};
use crate::raw::{RawSource, RunArchive, to_points};

/// 按目录约定定位原始 npz 文件：
/// `{base}/Run{run}/DetailedOutput-{id}.npz` 与 `{base}/Run{run}/VTKFile-{id}.npz`
#[derive(Debug, Clone)]
pub struct NpzSource {
    base_dir: PathBuf,
}

impl NpzSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn stats_path(&self, run: usize, sim_id: usize) -> PathBuf {
        self.base_dir
            .join(format!("Run{}", run))
            .join(format!("DetailedOutput-{}.npz", sim_id))
    }

    pub fn shells_path(&self, run: usize, sim_id: usize) -> PathBuf {
        self.base_dir
            .join(format!("Run{}", run))
            .join(format!("VTKFile-{}.npz", sim_id))
    }
}

impl RawSource for NpzSource {
    type Archive = NpzRunArchive;

    fn open_stats(&self, run: usize, sim_id: usize) -> Result<NpzRunArchive> {
        NpzRunArchive::open(self.stats_path(run, sim_id))
    }

    fn open_shells(&self, run: usize, sim_id: usize) -> Result<NpzRunArchive> {
        NpzRunArchive::open(self.shells_path(run, sim_id))
    }
}

/// 打开的 npz 文件，drop 时关闭
pub struct NpzRunArchive {
    path: PathBuf,
    archive: NpzArchive<BufReader<File>>,
}

impl NpzRunArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("打开 npz 文件 {}", path.display());
        let archive = NpzArchive::open(&path).map_err(|source| Error::Npz {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, archive })
    }

    /// 读取数据集，返回 (形状, 按 C 顺序展平的 f32 数据)
    ///
    /// 上游写出的数组可能是 f4 或 f8，f8 读取后降为 f32。
    fn read(&mut self, key: &str) -> Result<(Vec<usize>, Vec<f32>)> {
        let npz_err = |path: &Path, source| Error::Npz {
            path: path.to_path_buf(),
            source,
        };
        let npy = self
            .archive
            .by_name(key)
            .map_err(|e| npz_err(&self.path, e))?
            .ok_or_else(|| Error::MissingKey {
                path: self.path.clone(),
                key: key.to_string(),
            })?;

        let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
        let data = if npy.dtype().descr().contains("f4") {
            npy.into_vec::<f32>().map_err(|e| npz_err(&self.path, e))?
        } else {
            npy.into_vec::<f64>()
                .map_err(|e| npz_err(&self.path, e))?
                .into_iter()
                .map(|v| v as f32)
                .collect()
        };
        Ok((shape, data))
    }
}

impl RunArchive for NpzRunArchive {
    fn series(&mut self, key: &str) -> Result<Vec<f32>> {
        let (shape, data) = self.read(key)?;
        if shape.len() != 1 {
            return Err(Error::BadShape {
                key: key.to_string(),
                expected: vec![data.len()],
                actual: shape,
            });
        }
        Ok(data)
    }

    fn points(&mut self, key: &str) -> Result<Vec<[f32; 3]>> {
        let (shape, data) = self.read(key)?;
        to_points(key, &shape, data)
    }
}

#[cfg(test)]
mod tests {
    use npyz::WriterBuilder;

    use super::*;

    fn write_npz<T: npyz::AutoSerialize + Copy>(path: &Path, arrays: &[(&str, Vec<u64>, Vec<T>)]) {
        let mut npz = npyz::npz::NpzWriter::create(path).unwrap();
        for (name, shape, values) in arrays {
            let mut writer = npz
                .array(name, Default::default())
                .unwrap()
                .default_dtype()
                .shape(shape)
                .begin_nd()
                .unwrap();
            writer.extend(values.iter().copied()).unwrap();
            writer.finish().unwrap();
        }
    }

    #[test]
    fn reads_series_and_points_from_npz() {
        let dir = tempfile::tempdir().unwrap();
        let source = NpzSource::new(dir.path());
        std::fs::create_dir_all(dir.path().join("Run1")).unwrap();

        write_npz(
            &source.stats_path(1, 7),
            &[("MSD", vec![4], vec![0.0, 0.5, 1.0, 1.5])],
        );
        write_npz(
            &source.shells_path(1, 7),
            &[(
                "T0/Points",
                vec![2, 3],
                vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0],
            )],
        );

        let mut stats = source.open_stats(1, 7).unwrap();
        assert_eq!(stats.series("MSD").unwrap(), vec![0.0, 0.5, 1.0, 1.5]);
        assert!(matches!(
            stats.series("Volume"),
            Err(Error::MissingKey { .. })
        ));

        let mut shells = source.open_shells(1, 7).unwrap();
        assert_eq!(
            shells.points("T0/Points").unwrap(),
            vec![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0]]
        );
    }

    #[test]
    fn reads_single_precision_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let source = NpzSource::new(dir.path());
        std::fs::create_dir_all(dir.path().join("Run0")).unwrap();

        write_npz::<f32>(
            &source.stats_path(0, 3),
            &[("Volume", vec![3], vec![20.5, 21.25, 22.0])],
        );
        write_npz::<f32>(
            &source.shells_path(0, 3),
            &[("T4/Points", vec![1, 3], vec![0.5, -1.5, 2.25])],
        );

        let mut stats = source.open_stats(0, 3).unwrap();
        assert_eq!(stats.series("Volume").unwrap(), vec![20.5, 21.25, 22.0]);
        let mut shells = source.open_shells(0, 3).unwrap();
        assert_eq!(shells.points("T4/Points").unwrap(), vec![[0.5, -1.5, 2.25]]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = NpzSource::new(dir.path());
        assert!(matches!(source.open_stats(0, 1), Err(Error::Npz { .. })));
    }
}
