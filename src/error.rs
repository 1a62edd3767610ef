use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// 聚合、查询与查看器共用的错误类型
///
/// 所有错误都直接中止当前操作，不做重试，也不返回部分结果。
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO 错误 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 原始 npz 文件缺失或无法解码
    #[error("无法读取 npz 文件 {path}: {source}")]
    Npz {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("文件 {path} 中缺少数据集 '{key}'")]
    MissingKey { path: PathBuf, key: String },

    #[error("序列 '{key}' 长度为 {len}，至少需要 {required}")]
    ShortSeries {
        key: String,
        len: usize,
        required: usize,
    },

    #[error("数据集 '{key}' 形状不匹配: 期望 {expected:?}，实际 {actual:?}")]
    BadShape {
        key: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Schedule 第 {line} 行解析失败: {message}")]
    Schedule { line: usize, message: String },

    /// 合并数组文件的格式错误（magic、版本、数据集名等）
    #[error("数组文件 {path} 格式错误: {message}")]
    Container { path: PathBuf, message: String },

    #[error("{axis} 索引越界: {index} 不在 [0, {len}) 内")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    #[error("未知变量 '{0}'，可选值: Volume, rmsAngleDeficit, Asphericity")]
    UnknownVariable(String),

    #[error("凸包计算失败: {0}")]
    Hull(String),

    #[error("配置错误: {0}")]
    Config(String),

    /// 阻塞线程池中的查询任务被取消或 panic
    #[error("后台查询失败: {0}")]
    Blocking(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn container(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Container {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 检查索引是否落在 [0, len) 内
    pub(crate) fn check_index(axis: &'static str, index: usize, len: usize) -> Result<usize> {
        if index < len {
            Ok(index)
        } else {
            Err(Error::IndexOutOfRange { axis, index, len })
        }
    }
}
