mod memory;
mod npz;

pub use memory::{MemoryArchive, MemorySource};
pub use npz::{NpzRunArchive, NpzSource};

use crate::error::Result;

/// 单个原始文件中的命名数据集
///
/// 一个 archive 在被 drop 时关闭底层文件。
pub trait RunArchive {
    /// 读取一维序列，如 "MSD"、"Volume"
    fn series(&mut self, key: &str) -> Result<Vec<f32>>;

    /// 读取形状为 (N, 3) 的点云，如 "T0/Points"
    fn points(&mut self, key: &str) -> Result<Vec<[f32; 3]>>;
}

/// 原始模拟输出的来源
///
/// `sim_id` 为文件名中的 1 起始编号。每个 (run, sim_id) 对应两个文件：
/// 统计序列文件和外壳快照文件。
pub trait RawSource {
    type Archive: RunArchive;

    /// 打开统计序列文件 (MSD / Volume / RMSAngleDeficit)
    fn open_stats(&self, run: usize, sim_id: usize) -> Result<Self::Archive>;

    /// 打开外壳快照文件 (T{k}/Points)
    fn open_shells(&self, run: usize, sim_id: usize) -> Result<Self::Archive>;
}

/// 把展平的 (N*3) 坐标转换为点列表，并检查形状
pub(crate) fn to_points(key: &str, shape: &[usize], flat: Vec<f32>) -> Result<Vec<[f32; 3]>> {
    if shape.len() != 2 || shape[1] != 3 || flat.len() != shape[0] * 3 {
        return Err(crate::error::Error::BadShape {
            key: key.to_string(),
            expected: vec![shape.first().copied().unwrap_or(0), 3],
            actual: shape.to_vec(),
        });
    }
    Ok(flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}
